// src/feeds/fetcher.rs
//! HTTP GET of one feed with retry + exponential backoff.

use anyhow::Context;
use metrics::{counter, histogram};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feeds::connectivity::Connectivity;
use crate::feeds::ensure_metrics_described;
use crate::feeds::normalize::normalize_payload;
use crate::feeds::registry::FeedDescriptor;
use crate::feeds::types::{FeedResult, Item};

#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Per-attempt timeout; there is no deadline across the retry loop.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay after attempt `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
            user_agent: concat!("landing-feeds/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    connectivity: Arc<dyn Connectivity>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(policy: FetchPolicy, connectivity: Arc<dyn Connectivity>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(policy.user_agent.as_str())
            .connect_timeout(policy.timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            client,
            connectivity,
            policy,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// One attempt: GET, require 2xx, decode a JSON array, normalize per feed kind.
    pub async fn fetch_once(&self, desc: &FeedDescriptor) -> Result<Vec<Item>, FetchError> {
        if !self.connectivity.is_online() {
            return Err(FetchError::Offline);
        }

        let resp = self
            .client
            .get(&desc.url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .timeout(self.policy.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = resp.bytes().await?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        match value {
            Value::Array(values) => Ok(normalize_payload(desc.kind, values)),
            other => Err(FetchError::Malformed(format!(
                "expected array, got {}",
                json_type(&other)
            ))),
        }
    }

    /// `Some` on any successful attempt (a malformed payload counts as success
    /// with zero items); `None` once retries are exhausted or the client goes offline.
    pub async fn fetch_with_retry(&self, desc: &FeedDescriptor) -> Option<FeedResult> {
        ensure_metrics_described();
        let attempts = self.policy.max_retries.saturating_add(1);

        for attempt in 0..attempts {
            let t0 = Instant::now();
            let res = self.fetch_once(desc).await;

            match res {
                Ok(items) => {
                    counter!("feeds_fetch_total").increment(1);
                    histogram!("feeds_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    debug!(target: "fetch", key = %desc.key, items = items.len(), attempt, "feed fetched");
                    return Some(FeedResult::new(desc.key.as_str(), items));
                }
                Err(FetchError::Malformed(reason)) => {
                    counter!("feeds_fetch_total").increment(1);
                    counter!("feeds_malformed_total").increment(1);
                    warn!(target: "fetch", key = %desc.key, %reason, "malformed feed payload, treating as empty");
                    return Some(FeedResult::new(desc.key.as_str(), Vec::new()));
                }
                Err(e) if !e.is_retryable() => {
                    debug!(target: "fetch", key = %desc.key, attempt, error = %e, "giving up");
                    return None;
                }
                Err(e) => {
                    counter!("feeds_fetch_errors_total").increment(1);
                    warn!(target: "fetch", key = %desc.key, attempt, error = %e, "feed fetch failed");

                    if !self.connectivity.is_online() {
                        return None;
                    }
                    if attempt + 1 < attempts {
                        counter!("feeds_fetch_retries_total").increment(1);
                        tokio::time::sleep(self.policy.backoff_for(attempt)).await;
                    }
                }
            }
        }

        warn!(target: "fetch", key = %desc.key, attempts, "retries exhausted");
        None
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
