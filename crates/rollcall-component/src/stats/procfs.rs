//! Linux procfs sampler.
//!
//! `wired` has no direct Linux counterpart; `Unevictable` is reported in its place.
//! Non-Linux hosts report zeros.

use rollcall_core::error::Result;

use super::{RawSample, ResourceSampler};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsSampler;

impl ProcfsSampler {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceSampler for ProcfsSampler {
    #[cfg(target_os = "linux")]
    fn sample(&self) -> Result<RawSample> {
        use std::fs;

        use rollcall_core::error::RollcallError;

        let meminfo = fs::read_to_string("/proc/meminfo")
            .map_err(|e| RollcallError::Internal(format!("read meminfo failed: {e}")))?;
        let loadavg = fs::read_to_string("/proc/loadavg")
            .map_err(|e| RollcallError::Internal(format!("read loadavg failed: {e}")))?;
        // own status is best-effort
        let status = fs::read_to_string("/proc/self/status").unwrap_or_default();

        Ok(RawSample {
            active_bytes: kib_field(&meminfo, "Active:").saturating_mul(1024),
            wired_bytes: kib_field(&meminfo, "Unevictable:").saturating_mul(1024),
            inactive_bytes: kib_field(&meminfo, "Inactive:").saturating_mul(1024),
            free_bytes: kib_field(&meminfo, "MemFree:").saturating_mul(1024),
            load_one_minute: parse_load_one(&loadavg),
            process_rss_kib: kib_field(&status, "VmRSS:"),
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn sample(&self) -> Result<RawSample> {
        Ok(RawSample::default())
    }
}

/// Parse `"Label:   1234 kB"`; missing or garbled lines read as 0.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn kib_field(content: &str, label: &str) -> u64 {
    content
        .lines()
        .find_map(|l| l.strip_prefix(label))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_load_one(content: &str) -> f64 {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}
