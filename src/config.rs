// src/config.rs
//! Feed configuration: registry overrides, fetch policy and cache policy.
//!
//! Resolution order:
//! 1) $FEEDS_CONFIG_PATH (must exist when set)
//! 2) config/feeds.toml
//! 3) built-in defaults
//!
//! `FEEDS_BASE_URL` and `LANDING_CACHE_PATH` override the file afterwards.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feeds::cache::CachePolicy;
use crate::feeds::fetcher::FetchPolicy;
use crate::feeds::registry::{FeedDescriptor, FeedRegistry};

pub const DEFAULT_FEEDS_CONFIG_PATH: &str = "config/feeds.toml";
pub const ENV_FEEDS_CONFIG_PATH: &str = "FEEDS_CONFIG_PATH";
pub const ENV_FEEDS_BASE_URL: &str = "FEEDS_BASE_URL";
pub const ENV_LANDING_CACHE_PATH: &str = "LANDING_CACHE_PATH";

const MAX_RETRIES_CAP: u32 = 5;

fn default_base_url() -> String {
    "http://localhost:8080/feeds".to_string()
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("cache/landing-cache.json")
}
fn default_freshness_secs() -> u64 {
    3600
}
fn default_write_gate_secs() -> u64 {
    24 * 3600
}
fn default_write_debounce_ms() -> u64 {
    2000
}
fn default_refresh_min_interval_secs() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    FetchPolicy::default().user_agent
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    #[serde(default = "default_write_gate_secs")]
    pub write_gate_secs: u64,
    #[serde(default = "default_write_debounce_ms")]
    pub write_debounce_ms: u64,
    #[serde(default = "default_refresh_min_interval_secs")]
    pub refresh_min_interval_secs: u64,
    /// 0 disables the background refresh task.
    #[serde(default)]
    pub background_refresh_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_path: default_cache_path(),
            freshness_secs: default_freshness_secs(),
            write_gate_secs: default_write_gate_secs(),
            write_debounce_ms: default_write_debounce_ms(),
            refresh_min_interval_secs: default_refresh_min_interval_secs(),
            background_refresh_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsConfig {
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub fetch: FetchSection,
    /// Replaces the built-in registry when non-empty.
    #[serde(default)]
    pub feeds: Vec<FeedDescriptor>,
    /// Extra UI label -> feed key aliases.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl FeedsConfig {
    /// Env path, then `config/feeds.toml`, then defaults; env overrides applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_FEEDS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_FEEDS_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_FEEDS_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from_file(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading feeds config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing feeds config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: FeedsConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_FEEDS_BASE_URL) {
            if !url.trim().is_empty() {
                self.provider.base_url = url.trim().to_string();
            }
        }
        if let Ok(p) = std::env::var(ENV_LANDING_CACHE_PATH) {
            if !p.trim().is_empty() {
                self.provider.cache_path = PathBuf::from(p.trim());
            }
        }
    }

    fn sanitize(&mut self) {
        let p = &mut self.provider;
        if p.freshness_secs == 0 {
            p.freshness_secs = default_freshness_secs();
        }
        if p.write_gate_secs == 0 {
            p.write_gate_secs = default_write_gate_secs();
        }
        if p.write_debounce_ms == 0 {
            p.write_debounce_ms = default_write_debounce_ms();
        }

        let f = &mut self.fetch;
        if f.timeout_secs == 0 {
            f.timeout_secs = default_timeout_secs();
        }
        if f.backoff_base_ms == 0 {
            f.backoff_base_ms = default_backoff_base_ms();
        }
        f.max_retries = f.max_retries.min(MAX_RETRIES_CAP);
        if f.user_agent.trim().is_empty() {
            f.user_agent = default_user_agent();
        }

        self.feeds.retain(|d| !d.key.trim().is_empty() && !d.url.trim().is_empty());
    }

    pub fn registry(&self) -> FeedRegistry {
        if self.feeds.is_empty() {
            let mut reg = FeedRegistry::default_seed(&self.provider.base_url);
            if !self.aliases.is_empty() {
                reg = FeedRegistry::from_parts(reg.iter().cloned().collect(), &self.aliases);
            }
            reg
        } else {
            FeedRegistry::from_parts(self.feeds.clone(), &self.aliases)
        }
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_retries: self.fetch.max_retries,
            backoff_base: Duration::from_millis(self.fetch.backoff_base_ms),
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            freshness: Duration::from_secs(self.provider.freshness_secs),
            write_gate: Duration::from_secs(self.provider.write_gate_secs),
            debounce: Duration::from_millis(self.provider.write_debounce_ms),
        }
    }

    pub fn refresh_min_interval(&self) -> Duration {
        Duration::from_secs(self.provider.refresh_min_interval_secs)
    }

    pub fn background_refresh(&self) -> Option<Duration> {
        (self.provider.background_refresh_secs > 0)
            .then(|| Duration::from_secs(self.provider.background_refresh_secs))
    }
}
