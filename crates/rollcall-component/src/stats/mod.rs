//! Cached resource statistics.
//!
//! Sampling memory and load is comparatively expensive and varz may be polled
//! often, so samples are reused for a fixed freshness window. A cached sample
//! may be up to one window stale.

mod procfs;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use rollcall_core::error::{Result, RollcallError};

pub use procfs::ProcfsSampler;

/// Raw counters as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub active_bytes: u64,
    pub wired_bytes: u64,
    pub inactive_bytes: u64,
    pub free_bytes: u64,
    pub load_one_minute: f64,
    /// Resident set of this process, KiB.
    pub process_rss_kib: u64,
}

/// Resource source (OS collaborator). `sample` may block; the cache runs it
/// on the blocking pool.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> Result<RawSample>;
}

/// Derived figures merged into varz.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSample {
    pub mem_used_bytes: u64,
    pub mem_free_bytes: u64,
    pub cpu_load_avg: f64,
    pub mem_kib: u64,
}

impl From<RawSample> for StatsSample {
    fn from(raw: RawSample) -> Self {
        Self {
            mem_used_bytes: raw.active_bytes.saturating_add(raw.wired_bytes),
            mem_free_bytes: raw.inactive_bytes.saturating_add(raw.free_bytes),
            cpu_load_avg: raw.load_one_minute,
            mem_kib: raw.process_rss_kib,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cached {
    at: Instant,
    sample: StatsSample,
}

pub struct StatsCache {
    sampler: Arc<dyn ResourceSampler>,
    window: Duration,
    last: Mutex<Option<Cached>>,
}

impl StatsCache {
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(sampler: Arc<dyn ResourceSampler>, window: Duration) -> Self {
        Self {
            sampler,
            window,
            last: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Return the cached sample, re-sampling first if none exists or the
    /// window has elapsed.
    ///
    /// A failed sample keeps the previous figures (zeros if there are none)
    /// and still restarts the window. The lock is held across sampling so
    /// concurrent callers wait for one sample instead of taking their own.
    pub async fn snapshot(&self) -> StatsSample {
        let mut last = self.last.lock().await;
        if let Some(c) = *last {
            if c.at.elapsed() < self.window {
                return c.sample;
            }
        }

        let sampler = Arc::clone(&self.sampler);
        let sampled = tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .map_err(|e| RollcallError::Internal(format!("sampler task failed: {e}")))
            .and_then(|r| r);
        let sample = match sampled {
            Ok(raw) => StatsSample::from(raw),
            Err(e) => {
                tracing::warn!(error = %e, "resource sampling failed; keeping previous stats");
                (*last).map(|c| c.sample).unwrap_or_default()
            }
        };
        *last = Some(Cached {
            at: Instant::now(),
            sample,
        });
        sample
    }

    /// Force the next `snapshot` to re-sample.
    pub async fn invalidate(&self) {
        *self.last.lock().await = None;
    }
}
