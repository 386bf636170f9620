//! Discovery wire protocol.
//!
//! Announcements travel as JSON on two fixed subjects:
//! - `component.announce`: published once at registration.
//! - `component.discover`: request/reply; every request gets one announcement back.

pub mod announce;

pub use announce::{Announcement, Credentials};

/// Subject a component publishes to once it has registered.
pub const ANNOUNCE_SUBJECT: &str = "component.announce";

/// Subject a component listens on for discovery requests.
pub const DISCOVER_SUBJECT: &str = "component.discover";

/// Key that registration input may never carry.
pub const RESERVED_KEY: &str = "config";
