// src/feeds/provider.rs
//! Orchestrator: owns the in-memory landing state and the cache store, loads
//! the cache at startup and runs prioritized fetches. Construct one instance at
//! startup and share it behind an `Arc`.

use metrics::gauge;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::FeedsConfig;
use crate::feeds::cache::{CacheStore, Freshness};
use crate::feeds::connectivity::Connectivity;
use crate::feeds::fetcher::Fetcher;
use crate::feeds::merge::LandingState;
use crate::feeds::registry::{group_by_priority, FeedDescriptor, FeedRegistry};
use crate::feeds::types::{FeedResult, Item, LandingMap};

/// What the rest of the application reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingSnapshot {
    pub landing_data: LandingMap,
    pub filtered_landing_data: LandingMap,
    pub main_landing_data: Vec<Item>,
    pub is_loading: bool,
    pub priority_data_loaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Skipped { reason: SkipReason },
    Completed { succeeded: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryRefresh {
    /// The label resolved to a key with no descriptor.
    Unknown { key: String },
    Offline,
    Failed { key: String },
    Updated { key: String, items: usize, filtered: usize },
}

pub struct LandingProvider {
    registry: FeedRegistry,
    fetcher: Fetcher,
    cache: CacheStore,
    connectivity: Arc<dyn Connectivity>,
    state: RwLock<LandingState>,
    /// Staged runs in flight; `start` and `refresh_all` may overlap.
    in_flight: AtomicUsize,
    priority_loaded: AtomicBool,
    last_refresh: Mutex<Option<Instant>>,
    refresh_min_interval: Duration,
}

impl LandingProvider {
    pub fn new(
        registry: FeedRegistry,
        fetcher: Fetcher,
        cache: CacheStore,
        connectivity: Arc<dyn Connectivity>,
        refresh_min_interval: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
            connectivity,
            state: RwLock::new(LandingState::default()),
            in_flight: AtomicUsize::new(0),
            priority_loaded: AtomicBool::new(false),
            last_refresh: Mutex::new(None),
            refresh_min_interval,
        }
    }

    pub fn from_config(cfg: &FeedsConfig, connectivity: Arc<dyn Connectivity>) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(cfg.fetch_policy(), connectivity.clone())?;
        let cache = CacheStore::new(cfg.provider.cache_path.clone(), cfg.cache_policy());
        Ok(Self::new(
            cfg.registry(),
            fetcher,
            cache,
            connectivity,
            cfg.refresh_min_interval(),
        ))
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn priority_data_loaded(&self) -> bool {
        self.priority_loaded.load(Ordering::SeqCst)
    }

    /// Load the cache into memory. Never fails; a missing/corrupt file is a cold start.
    pub async fn initial_load(&self) -> Freshness {
        let loaded = self.cache.load().await;
        self.write_state().replace_all(loaded.data);
        self.update_priority_flag();
        loaded.freshness
    }

    /// `initial_load`, then a staged fetch of every feed (high, medium, low)
    /// when online and the cache is not fresh or holds no priority data.
    pub async fn start(&self) -> Freshness {
        let freshness = self.initial_load().await;

        if !self.is_online() {
            info!(target: "provider", ?freshness, "offline at startup, serving cache only");
            return freshness;
        }
        if freshness == Freshness::Fresh && self.priority_data_loaded() {
            debug!(target: "provider", "cache fresh, skipping startup fetch");
            return freshness;
        }

        let feeds: Vec<FeedDescriptor> = self.registry.iter().cloned().collect();
        let (succeeded, failed) = self.fetch_in_priority_groups(&feeds).await;
        info!(target: "provider", ?freshness, succeeded, failed, "startup fetch finished");
        freshness
    }

    /// Refresh every landing feed. Rate-limited; no-op when offline.
    pub async fn refresh_all(&self) -> RefreshOutcome {
        if !self.is_online() {
            return RefreshOutcome::Skipped {
                reason: SkipReason::Offline,
            };
        }

        {
            let mut last = self
                .last_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(t) = *last {
                if t.elapsed() < self.refresh_min_interval {
                    debug!(target: "provider", "refresh_all rate-limited");
                    return RefreshOutcome::Skipped {
                        reason: SkipReason::RateLimited,
                    };
                }
            }
            *last = Some(Instant::now());
        }

        let feeds: Vec<FeedDescriptor> = self
            .registry
            .landing_feeds()
            .into_iter()
            .cloned()
            .collect();
        let (succeeded, failed) = self.fetch_in_priority_groups(&feeds).await;
        info!(target: "provider", succeeded, failed, "landing refresh finished");
        RefreshOutcome::Completed { succeeded, failed }
    }

    /// Refresh the feed behind a UI category label.
    pub async fn refresh_one(&self, label: &str) -> CategoryRefresh {
        let key = self.registry.normalize_label(label);
        let Some(desc) = self.registry.get(&key).cloned() else {
            warn!(target: "provider", %label, %key, "no feed registered for category");
            return CategoryRefresh::Unknown { key };
        };
        if !self.is_online() {
            return CategoryRefresh::Offline;
        }
        self.refresh_feed(&desc).await
    }

    /// Fetch one descriptor and apply it as a single-key update.
    pub async fn refresh_feed(&self, desc: &FeedDescriptor) -> CategoryRefresh {
        let Some(result) = fetch_and_queue(&self.fetcher, &self.cache, desc).await else {
            return CategoryRefresh::Failed {
                key: desc.key.clone(),
            };
        };

        let key = result.key.clone();
        let items = result.items.len();
        let filtered = {
            let mut st = self.write_state();
            if st.apply_one(result) {
                st.filtered.get(&key).map_or(0, Vec::len)
            } else {
                0
            }
        };
        self.update_priority_flag();

        debug!(target: "provider", %key, items, filtered, "category refreshed");
        CategoryRefresh::Updated {
            key,
            items,
            filtered,
        }
    }

    pub fn snapshot(&self) -> LandingSnapshot {
        let st = self.read_state();
        LandingSnapshot {
            landing_data: st.landing.clone(),
            filtered_landing_data: st.filtered.clone(),
            main_landing_data: st.main.clone(),
            is_loading: self.is_loading(),
            priority_data_loaded: self.priority_data_loaded(),
        }
    }

    pub fn main_list(&self) -> Vec<Item> {
        self.read_state().main.clone()
    }

    pub fn filtered(&self, key: &str) -> Option<Vec<Item>> {
        self.read_state().filtered.get(key).cloned()
    }

    pub fn landing(&self, key: &str) -> Option<Vec<Item>> {
        self.read_state().landing.get(key).cloned()
    }

    /// Fetch `feeds` group by group; feeds inside a group run concurrently and
    /// each group is applied as one batch. Returns (succeeded, failed).
    async fn fetch_in_priority_groups(&self, feeds: &[FeedDescriptor]) -> (usize, usize) {
        let _loading = InFlight::enter(&self.in_flight);
        let mut succeeded = 0;
        let mut failed = 0;

        for (priority, group) in group_by_priority(feeds) {
            let requested = group.len();
            let results = self.fetch_group(group).await;
            succeeded += results.len();
            failed += requested - results.len();

            let replaced = self.write_state().apply(results);
            self.update_priority_flag();
            debug!(target: "provider", ?priority, requested, replaced, "priority group applied");
        }

        gauge!("feeds_last_refresh_ts").set(chrono::Utc::now().timestamp() as f64);
        (succeeded, failed)
    }

    async fn fetch_group(&self, group: Vec<&FeedDescriptor>) -> Vec<FeedResult> {
        let mut set = JoinSet::new();
        for desc in group {
            let fetcher = self.fetcher.clone();
            let cache = self.cache.clone();
            let desc = desc.clone();
            set.spawn(async move { fetch_and_queue(&fetcher, &cache, &desc).await });
        }

        let mut out = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(r)) => out.push(r),
                Ok(None) => {}
                Err(e) => warn!(target: "provider", error = %e, "fetch task aborted"),
            }
        }
        out
    }

    fn update_priority_flag(&self) {
        let loaded = {
            let st = self.read_state();
            self.registry
                .high_priority_keys()
                .iter()
                .any(|k| st.has_filtered(k))
        };
        if loaded {
            self.priority_loaded.store(true, Ordering::SeqCst);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LandingState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LandingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts one staged run for `is_loading`; released on drop.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetch with retry; a non-empty success is handed to the cache's write queue.
async fn fetch_and_queue(
    fetcher: &Fetcher,
    cache: &CacheStore,
    desc: &FeedDescriptor,
) -> Option<FeedResult> {
    let result = fetcher.fetch_with_retry(desc).await?;
    if !result.items.is_empty() {
        cache.queue_update(result.key.clone(), result.items.clone());
    }
    Some(result)
}
