// src/feeds/cache.rs
//! Tiered cache store over one JSON document.
//!
//! Read side: a freshness window (default 1h) decides whether the caller should
//! refresh; stale data is still served. Write side: every successful fetch is
//! buffered, but the file is only written when `lastCacheUpdate` is older than
//! the write gate (default 24h), and then only after a quiet period (default 2s)
//! so that a burst of fetches lands in one write. A flush merges the buffer over
//! the file's existing `data`; keys already on disk are never dropped.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::feeds::types::{lenient_landing_map, Item, LandingMap};

/// Persisted document: `{ data, timestamp, lastCacheUpdate }`, epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    #[serde(default, deserialize_with = "lenient_landing_map")]
    pub data: LandingMap,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub last_cache_update: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Empty,
    Fresh,
    Stale,
}

impl CacheEnvelope {
    pub fn freshness(&self, now_ms: i64, window: Duration) -> Freshness {
        if self.data.is_empty() {
            return Freshness::Empty;
        }
        let age = now_ms.saturating_sub(self.timestamp);
        if age >= 0 && (age as u128) < window.as_millis() {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub freshness: Duration,
    pub write_gate: Duration,
    pub debounce: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(3600),
            write_gate: Duration::from_secs(24 * 3600),
            debounce: Duration::from_secs(2),
        }
    }
}

/// Result of [`CacheStore::load`].
#[derive(Debug, Clone)]
pub struct LoadedCache {
    pub data: LandingMap,
    pub freshness: Freshness,
    pub timestamp: i64,
    pub last_cache_update: i64,
}

/// Cheap to clone; clones share the buffer, counters and file.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    policy: CachePolicy,
    pending: Mutex<Pending>,
    /// Bumped on every scheduled flush; a debounce task only flushes if it is still current.
    generation: AtomicU64,
    writes: AtomicU64,
    io: tokio::sync::Mutex<()>,
}

#[derive(Debug, Default)]
struct Pending {
    updates: HashMap<String, Vec<Item>>,
    last_cache_update: i64,
    /// Set while a taken buffer is being written; the gate counts as closed.
    flushing: bool,
}

impl Pending {
    fn gate_open(&self, now_ms: i64, gate: Duration) -> bool {
        !self.flushing && write_gate_open(now_ms, self.last_cache_update, gate)
    }
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                policy,
                pending: Mutex::new(Pending::default()),
                generation: AtomicU64::new(0),
                writes: AtomicU64::new(0),
                io: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Read the envelope. A missing or corrupt file yields an empty mapping.
    pub async fn load(&self) -> LoadedCache {
        let env = read_envelope(&self.inner.path).await;
        let freshness = env.freshness(now_ms(), self.inner.policy.freshness);
        self.pending().last_cache_update = env.last_cache_update;

        info!(
            target: "cache",
            keys = env.data.len(),
            ?freshness,
            path = %self.inner.path.display(),
            "landing cache loaded"
        );

        LoadedCache {
            data: env.data,
            freshness,
            timestamp: env.timestamp,
            last_cache_update: env.last_cache_update,
        }
    }

    /// Buffer an update. Schedules a debounced flush only when the write gate is
    /// open; returns whether it did.
    pub fn queue_update(&self, key: impl Into<String>, items: Vec<Item>) -> bool {
        let key = key.into();
        let open = {
            let mut st = self.pending();
            st.updates.insert(key.clone(), items);
            st.gate_open(now_ms(), self.inner.policy.write_gate)
        };

        if open {
            self.schedule_flush();
        } else {
            debug!(target: "cache", %key, "write gate closed, update buffered");
        }
        open
    }

    fn schedule_flush(&self) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!(target: "cache", "no tokio runtime, flush not scheduled");
            return;
        };
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let store = self.clone();
        let delay = self.inner.policy.debounce;

        rt.spawn(async move {
            tokio::time::sleep(delay).await;
            if store.inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = store.write_pending(true).await {
                warn!(target: "cache", error = ?e, "debounced cache flush failed");
            }
        });
    }

    /// Merge all buffered updates into the file and stamp both timestamps.
    /// Returns `Ok(false)` when there was nothing to write. On failure the
    /// taken buffer is not restored.
    pub async fn flush(&self) -> Result<bool> {
        self.write_pending(false).await
    }

    /// `gated` flushes re-check the write gate once the io lock is held, so a
    /// debounce scheduled before another write landed does not write again.
    async fn write_pending(&self, gated: bool) -> Result<bool> {
        let _io = self.inner.io.lock().await;

        let updates = {
            let mut st = self.pending();
            if gated && !st.gate_open(now_ms(), self.inner.policy.write_gate) {
                debug!(target: "cache", pending = st.updates.len(), "write gate closed, debounced flush skipped");
                return Ok(false);
            }
            let updates = std::mem::take(&mut st.updates);
            st.flushing = !updates.is_empty();
            updates
        };
        if updates.is_empty() {
            return Ok(false);
        }

        let mut env = read_envelope(&self.inner.path).await;
        let merged_keys = updates.len();
        env.data.extend(updates);

        let now = now_ms();
        env.timestamp = now;
        env.last_cache_update = now;

        if let Err(e) = write_envelope(&self.inner.path, &env).await {
            self.pending().flushing = false;
            warn!(target: "cache", error = ?e, dropped_keys = merged_keys, "landing cache write failed");
            return Err(e);
        }

        {
            let mut st = self.pending();
            st.last_cache_update = now;
            st.flushing = false;
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        counter!("feeds_cache_writes_total").increment(1);
        info!(
            target: "cache",
            merged_keys,
            total_keys = env.data.len(),
            "landing cache written"
        );
        Ok(true)
    }

    /// Number of successful disk writes by this store.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pending().updates.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn last_cache_update(&self) -> i64 {
        self.pending().last_cache_update
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn write_gate_open(now_ms: i64, last_cache_update: i64, gate: Duration) -> bool {
    let elapsed = now_ms.saturating_sub(last_cache_update);
    elapsed >= 0 && (elapsed as u128) >= gate.as_millis()
}

async fn read_envelope(path: &Path) -> CacheEnvelope {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => match serde_json::from_str(&s) {
            Ok(env) => env,
            Err(e) => {
                warn!(target: "cache", error = %e, path = %path.display(), "corrupt landing cache, starting cold");
                CacheEnvelope::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "cache", path = %path.display(), "no landing cache yet");
            CacheEnvelope::default()
        }
        Err(e) => {
            warn!(target: "cache", error = %e, path = %path.display(), "landing cache unreadable");
            CacheEnvelope::default()
        }
    }
}

async fn write_envelope(path: &Path, env: &CacheEnvelope) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating cache dir {}", dir.display()))?;
    }
    let json = serde_json::to_vec(env).context("serializing landing cache")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn freshness_window() {
        let mut env = CacheEnvelope::default();
        let window = Duration::from_secs(3600);
        assert_eq!(env.freshness(10 * HOUR_MS, window), Freshness::Empty);

        env.data.insert("home-landing".into(), vec![Item::new("1", "A", "x")]);
        env.timestamp = 10 * HOUR_MS;
        assert_eq!(env.freshness(10 * HOUR_MS + 59 * 60_000, window), Freshness::Fresh);
        assert_eq!(env.freshness(11 * HOUR_MS, window), Freshness::Stale);
    }

    #[test]
    fn write_gate_opens_after_a_day() {
        let gate = Duration::from_secs(24 * 3600);
        let last = 100 * HOUR_MS;
        assert!(!write_gate_open(last + 23 * HOUR_MS, last, gate));
        assert!(write_gate_open(last + 24 * HOUR_MS, last, gate));
        // never written
        assert!(write_gate_open(last, 0, gate));
    }

    #[test]
    fn gate_is_closed_while_a_write_is_in_progress() {
        let gate = Duration::from_secs(24 * 3600);
        let mut st = Pending::default();
        assert!(st.gate_open(HOUR_MS, gate));
        st.flushing = true;
        assert!(!st.gate_open(HOUR_MS, gate));
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let env = CacheEnvelope {
            data: LandingMap::new(),
            timestamp: 1,
            last_cache_update: 2,
        };
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["lastCacheUpdate"], 2);
        assert_eq!(v["timestamp"], 1);
    }

    #[test]
    fn envelope_tolerates_nulls_in_arrays() {
        let env: CacheEnvelope = serde_json::from_str(
            r#"{"data":{"news-landing":[null,{"id":"1","title":"A","thumbnail":"x"}],"bad":5},"timestamp":1}"#,
        )
        .unwrap();
        assert_eq!(env.data["news-landing"].len(), 1);
        assert!(!env.data.contains_key("bad"));
        assert_eq!(env.last_cache_update, 0);
    }
}
