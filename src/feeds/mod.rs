// src/feeds/mod.rs
pub mod cache;
pub mod connectivity;
pub mod fetcher;
pub mod merge;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod validate;

pub use cache::{CacheStore, Freshness};
pub use connectivity::{Connectivity, OnlineFlag};
pub use provider::{CategoryRefresh, LandingProvider, LandingSnapshot, RefreshOutcome};
pub use registry::{FeedDescriptor, FeedKind, FeedRegistry, Priority};
pub use types::{FeedResult, Item, ItemKind, LandingMap};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feeds_fetch_total", "Feed fetch attempts that returned a payload.");
        describe_counter!(
            "feeds_fetch_errors_total",
            "Feed fetch attempts that failed (transport, timeout, status)."
        );
        describe_counter!("feeds_fetch_retries_total", "Backoff retries scheduled.");
        describe_counter!(
            "feeds_malformed_total",
            "Payloads that were not a JSON array."
        );
        describe_counter!(
            "feeds_items_dropped_total",
            "Items removed by the validator."
        );
        describe_counter!("feeds_cache_writes_total", "Landing cache file writes.");
        describe_histogram!("feeds_fetch_ms", "Successful fetch time in milliseconds.");
        describe_gauge!(
            "feeds_last_refresh_ts",
            "Unix ts when a prioritized refresh last finished."
        );
    });
}
