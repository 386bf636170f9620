//! Varz: the mutable key/value registry published on `/varz`.
//!
//! Non-stats keys are only ever written by `seed` and `set`; `snapshot`
//! overwrites the fixed stats keys in place, so repeated snapshots never
//! grow the map.

use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::protocol::{Credentials, RESERVED_KEY};

use crate::identity::Identity;
use crate::stats::StatsCache;

/// Registration-time facts copied into the store by `seed`.
#[derive(Debug, Clone)]
pub struct SeedFields<'a> {
    pub identity: &'a Identity,
    pub credentials: &'a Credentials,
    pub host: &'a str,
    pub start: &'a str,
}

pub struct VarzStore {
    entries: RwLock<Map<String, Value>>,
    stats: StatsCache,
    started: Instant,
    num_cores: usize,
}

impl VarzStore {
    pub fn new(stats: StatsCache, started: Instant) -> Self {
        let num_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            entries: RwLock::new(Map::new()),
            stats,
            started,
            num_cores,
        }
    }

    pub fn stats(&self) -> &StatsCache {
        &self.stats
    }

    /// Replace the store contents with `metadata` plus the registration facts.
    ///
    /// Rejects a reserved key before touching the store; the new map is
    /// swapped in under a single write lock.
    pub async fn seed(&self, metadata: &Map<String, Value>, fields: SeedFields<'_>) -> Result<()> {
        reject_reserved(metadata.keys().map(String::as_str))?;

        let mut next = metadata.clone();
        next.insert("type".into(), json!(fields.identity.component_type()));
        next.insert("index".into(), json!(fields.identity.index()));
        next.insert("uuid".into(), json!(fields.identity.uuid()));
        next.insert("host".into(), json!(fields.host));
        next.insert("credentials".into(), json!(fields.credentials));
        next.insert("start".into(), json!(fields.start));
        next.insert("num_cores".into(), json!(self.num_cores));

        *self.entries.write().await = next;
        Ok(())
    }

    /// Add or replace any non-reserved key.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        reject_reserved(std::iter::once(key.as_str()))?;
        self.entries.write().await.insert(key, value.into());
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Full copy with fresh (or cached, if within the window) stats.
    pub async fn snapshot(&self) -> Map<String, Value> {
        let stats = self.stats.snapshot().await;

        let mut entries = self.entries.write().await;
        entries.insert("mem_used_bytes".into(), json!(stats.mem_used_bytes));
        entries.insert("mem_free_bytes".into(), json!(stats.mem_free_bytes));
        entries.insert("cpu_load_avg".into(), json!(stats.cpu_load_avg));
        entries.insert("mem".into(), json!(stats.mem_kib));
        entries.insert("uptime".into(), json!(format_uptime(self.started.elapsed())));
        entries.clone()
    }
}

fn reject_reserved<'a>(mut keys: impl Iterator<Item = &'a str>) -> Result<()> {
    if keys.any(|k| k == RESERVED_KEY) {
        return Err(RollcallError::Validation(format!(
            "`{RESERVED_KEY}` may not be published in varz"
        )));
    }
    Ok(())
}

/// `"{d}d:{h}h:{m}m:{s}s"`
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{days}d:{hours}h:{minutes}m:{seconds}s")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use super::*;
    use crate::stats::{RawSample, ResourceSampler};

    struct Fixed(RawSample);

    impl ResourceSampler for Fixed {
        fn sample(&self) -> Result<RawSample> {
            Ok(self.0)
        }
    }

    fn store(raw: RawSample) -> VarzStore {
        let cache = StatsCache::new(Arc::new(Fixed(raw)), StatsCache::DEFAULT_WINDOW);
        VarzStore::new(cache, Instant::now())
    }

    async fn seeded(raw: RawSample, metadata: Map<String, Value>) -> VarzStore {
        let s = store(raw);
        let id = Identity::allocate("type", 3).unwrap();
        let creds = Credentials::new("u", "p");
        s.seed(
            &metadata,
            SeedFields { identity: &id, credentials: &creds, host: "127.0.0.1:1", start: "now" },
        )
        .await
        .unwrap();
        s
    }

    #[tokio::test]
    async fn seed_publishes_identity_and_credentials() {
        let mut md = Map::new();
        md.insert("zone".into(), json!("z1"));
        let s = seeded(RawSample::default(), md).await;

        assert_eq!(s.get("type").await, Some(json!("type")));
        assert_eq!(s.get("index").await, Some(json!(3)));
        assert!(s.get("uuid").await.unwrap().as_str().unwrap().starts_with("3-"));
        assert_eq!(s.get("credentials").await, Some(json!(["u", "p"])));
        assert_eq!(s.get("zone").await, Some(json!("z1")));
    }

    #[tokio::test]
    async fn reserved_key_is_rejected_without_mutation() {
        let s = seeded(RawSample::default(), Map::new()).await;
        let before = s.entries.read().await.clone();

        let mut md = Map::new();
        md.insert("config".into(), json!("fake config"));
        md.insert("other".into(), json!(1));
        let id = Identity::allocate("x", 0).unwrap();
        let creds = Credentials::new("a", "b");
        let err = s
            .seed(&md, SeedFields { identity: &id, credentials: &creds, host: "h:1", start: "" })
            .await
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "VALIDATION");
        assert_eq!(*s.entries.read().await, before);

        assert!(s.set("config", "x").await.is_err());
        assert!(!s.contains_key("config").await);
    }

    #[tokio::test]
    async fn snapshot_merges_stats() {
        let raw = RawSample {
            active_bytes: 75,
            wired_bytes: 25,
            inactive_bytes: 660,
            free_bytes: 340,
            load_one_minute: 2.0,
            process_rss_kib: 0,
        };
        let s = seeded(raw, Map::new()).await;
        let snap = s.snapshot().await;
        assert_eq!(snap["mem_used_bytes"], json!(100));
        assert_eq!(snap["mem_free_bytes"], json!(1000));
        assert_eq!(snap["cpu_load_avg"], json!(2.0));

        s.stats().invalidate().await;
        assert_eq!(s.snapshot().await["mem_used_bytes"], json!(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn snapshot_never_sees_partial_seed() {
        let s = Arc::new(store(RawSample::default()));
        let set = |prefix: &str| -> Map<String, Value> {
            (0..40).map(|i| (format!("{prefix}{i}"), json!(i))).collect()
        };
        let (a, b) = (set("a"), set("b"));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let snap = s.snapshot().await;
                        let from_a = (0..40).filter(|i| snap.contains_key(&format!("a{i}"))).count();
                        let from_b = (0..40).filter(|i| snap.contains_key(&format!("b{i}"))).count();
                        let whole = |n: usize| n == 0 || n == 40;
                        assert!(whole(from_a) && whole(from_b), "partial seed: a={from_a} b={from_b}");
                        assert!(from_a == 0 || from_b == 0);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let id = Identity::allocate("type", 0).unwrap();
        let creds = Credentials::new("u", "p");
        for round in 0..100 {
            let md = if round % 2 == 0 { &a } else { &b };
            s.seed(md, SeedFields { identity: &id, credentials: &creds, host: "h:1", start: "" })
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
        for r in readers {
            r.await.unwrap();
        }
    }

    #[tokio::test]
    async fn repeated_snapshots_do_not_grow() {
        let s = seeded(RawSample::default(), Map::new()).await;
        let first = s.snapshot().await.len();
        let second = s.snapshot().await.len();
        assert_eq!(first, second);

        s.set("var", "♳♴♵♶♷").await.unwrap();
        let third = s.snapshot().await;
        assert_eq!(third.len(), first + 1);
        assert_eq!(third["var"], json!("♳♴♵♶♷"));
    }

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(Duration::from_secs(5)), "0d:0h:0m:5s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d:1h:1m:1s");
    }
}
