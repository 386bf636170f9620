//! Component config loader (strict parsing).

pub mod schema;

use std::fs;

use rollcall_core::error::{Result, RollcallError};

pub use schema::{RegisterOptions, RollcallConfig};

pub fn load_from_file(path: &str) -> Result<RollcallConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RollcallError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RollcallConfig> {
    let cfg: RollcallConfig = serde_yaml::from_str(s)
        .map_err(|e| RollcallError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
