//! Announcement payload (JSON).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{Result, RollcallError};

/// Basic-auth credentials, serialized as a `[user, password]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials(pub String, pub String);

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self(user.into(), password.into())
    }

    pub fn user(&self) -> &str {
        &self.0
    }

    pub fn password(&self) -> &str {
        &self.1
    }

    /// Does a presented `user:password` pair match? Constant-time in the
    /// contents; both halves are always compared.
    pub fn matches(&self, user: &str, password: &str) -> bool {
        let user_ok = self.0.as_bytes().ct_eq(user.as_bytes());
        let password_ok = self.1.as_bytes().ct_eq(password.as_bytes());
        (user_ok & password_ok).into()
    }
}

/// Presence message published on announce and in reply to discover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// Component type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub component_type: String,
    pub index: u32,
    /// `"{index}-{token}"`, stable for the process lifetime.
    pub uuid: String,
    /// `ip:port` of the monitoring endpoint.
    pub host: String,
    /// Credentials for the monitoring endpoint.
    pub credentials: Credentials,
    /// Registration wall-clock time.
    #[serde(default)]
    pub start: String,
    /// `"{d}d:{h}h:{m}m:{s}s"` at the time of sending.
    #[serde(default)]
    pub uptime: String,
}

impl Announcement {
    pub fn encode(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| RollcallError::Internal(format!("announcement encode failed: {e}")))
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| RollcallError::MalformedRequest(format!("announcement decode failed: {e}")))
    }
}
