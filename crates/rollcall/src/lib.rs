//! Top-level facade crate for rollcall.
//!
//! Re-exports the core types and the component runtime so users can depend on a single crate.

pub mod core {
    pub use rollcall_core::*;
}

pub mod component {
    pub use rollcall_component::*;
}
