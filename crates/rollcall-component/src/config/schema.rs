use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;
use serde_json::{Map, Value};

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::protocol::{Credentials, RESERVED_KEY};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollcallConfig {
    pub version: u32,

    pub component: RegisterOptions,
}

impl RollcallConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RollcallError::UnsupportedVersion);
        }
        self.component.validate()
    }
}

/// Registration input.
///
/// Every key not named here lands in `metadata` and is published as-is in
/// varz, except the reserved `config` key which fails validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterOptions {
    #[serde(rename = "type", default)]
    pub component_type: Option<String>,

    #[serde(default)]
    pub index: u32,

    /// Monitoring port; `None` or 0 binds an ephemeral port.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_host_ip")]
    pub host_ip: IpAddr,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_stats_refresh_ms")]
    pub stats_refresh_ms: u64,

    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl RegisterOptions {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: Some(component_type.into()),
            index: 0,
            port: None,
            host_ip: default_host_ip(),
            user: None,
            password: None,
            stats_refresh_ms: default_stats_refresh_ms(),
            metadata: Map::new(),
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Single validation step; runs before any registration state is touched.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.contains_key(RESERVED_KEY) {
            return Err(RollcallError::Validation(format!(
                "`{RESERVED_KEY}` may not be published in varz"
            )));
        }
        match self.component_type.as_deref() {
            Some(t) if !t.trim().is_empty() => {}
            _ => return Err(RollcallError::Config("type is required".into())),
        }
        if self.user.is_some() != self.password.is_some() {
            return Err(RollcallError::Config(
                "user and password must be supplied together".into(),
            ));
        }
        if !(10..=60_000).contains(&self.stats_refresh_ms) {
            return Err(RollcallError::Config(
                "stats_refresh_ms must be between 10 and 60000".into(),
            ));
        }
        Ok(())
    }

    /// Supplied credentials, if both halves are present.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        }
    }
}

fn default_host_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_stats_refresh_ms() -> u64 {
    1000
}
