// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use landing_feeds::feeds::cache::{CachePolicy, CacheStore};
use landing_feeds::feeds::fetcher::{FetchPolicy, Fetcher};
use landing_feeds::feeds::{
    Connectivity, FeedDescriptor, FeedKind, FeedRegistry, LandingProvider, OnlineFlag, Priority,
};
use serde_json::{json, Value};

pub fn article(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "excerpt": format!("About {title}"),
        "date": "2026-10-17T09:00:00+08:00",
        "thumbnail": format!("https://img.test/{id}.jpg"),
        "permalink": format!("https://news.test/{id}")
    })
}

/// Millisecond backoff so retry tests stay fast.
pub fn fast_fetch_policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(2),
        max_retries: 2,
        backoff_base: Duration::from_millis(10),
        user_agent: "landing-feeds-test".to_string(),
    }
}

pub fn fast_cache_policy() -> CachePolicy {
    CachePolicy {
        debounce: Duration::from_millis(50),
        ..CachePolicy::default()
    }
}

pub fn feed(key: &str, base: &str, priority: Priority) -> FeedDescriptor {
    FeedDescriptor::new(key, &format!("{base}/{key}.json"), priority, FeedKind::Article)
}

pub fn fetcher(online: &OnlineFlag) -> Fetcher {
    let conn: Arc<dyn Connectivity> = Arc::new(online.clone());
    Fetcher::new(fast_fetch_policy(), conn).expect("fetcher")
}

pub fn provider(
    feeds: Vec<FeedDescriptor>,
    cache_path: &Path,
    online: &OnlineFlag,
) -> LandingProvider {
    let conn: Arc<dyn Connectivity> = Arc::new(online.clone());
    LandingProvider::new(
        FeedRegistry::from_parts(feeds, &HashMap::new()),
        Fetcher::new(fast_fetch_policy(), conn.clone()).expect("fetcher"),
        CacheStore::new(cache_path, fast_cache_policy()),
        conn,
        Duration::from_secs(10),
    )
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn write_cache(path: &Path, data: Value, timestamp: i64, last_cache_update: i64) {
    let env = json!({
        "data": data,
        "timestamp": timestamp,
        "lastCacheUpdate": last_cache_update
    });
    std::fs::write(path, serde_json::to_vec(&env).unwrap()).unwrap();
}

pub fn read_cache(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).expect("cache file")).expect("cache json")
}
