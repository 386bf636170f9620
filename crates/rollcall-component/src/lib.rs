//! rollcall component library entry.
//!
//! This crate wires identity allocation, the stats cache, the varz store, the
//! bus-facing announcement publisher and the monitoring HTTP server into a
//! single registration call. It is intended to be consumed by the binary
//! (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod announce;
pub mod bus;
pub mod config;
pub mod http;
pub mod identity;
pub mod registrar;
pub mod stats;
pub mod varz;

pub use registrar::{Component, Registrar};
