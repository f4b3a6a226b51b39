// src/feeds/registry.rs
//! # Feed Registry
//!
//! Static table of named remote JSON endpoints. Each descriptor carries a
//! priority class and a content kind; the `key` is the stable identifier used
//! for cache slots and UI category mapping.
//!
//! - Built-in `default_seed()` covering the landing sections.
//! - Optional override from `[[feeds]]` / `[aliases]` in the TOML config.
//! - Label normalization: loosely-cased UI labels ("TOP BUSINESS") resolve to
//!   canonical keys through an alias table; unknown labels pass through
//!   lower-cased, which callers must treat as a possible silent miss.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suffix shared by all landing-page feeds refreshed by `refresh_all`.
pub const LANDING_SUFFIX: &str = "-landing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Article,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub key: String,
    pub url: String,
    pub priority: Priority,
    #[serde(default)]
    pub kind: FeedKind,
}

impl FeedDescriptor {
    pub fn new(key: &str, url: &str, priority: Priority, kind: FeedKind) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
            priority,
            kind,
        }
    }

    pub fn is_landing(&self) -> bool {
        self.key.ends_with(LANDING_SUFFIX)
    }
}

#[derive(Debug, Clone)]
pub struct FeedRegistry {
    articles: Vec<FeedDescriptor>,
    videos: Vec<FeedDescriptor>,
    /// Normalized (upper-case, single-spaced) label -> feed key.
    aliases: HashMap<String, String>,
}

const SEED_FEEDS: &[(&str, Priority, FeedKind)] = &[
    ("super-highlight", Priority::High, FeedKind::Article),
    ("home-landing", Priority::High, FeedKind::Article),
    ("news-landing", Priority::High, FeedKind::Article),
    ("fmt-news", Priority::High, FeedKind::Article),
    ("business-landing", Priority::High, FeedKind::Article),
    ("berita-landing", Priority::Medium, FeedKind::Article),
    ("world-landing", Priority::Medium, FeedKind::Article),
    ("opinion-landing", Priority::Medium, FeedKind::Article),
    ("sports-landing", Priority::Medium, FeedKind::Article),
    ("lifestyle-landing", Priority::Low, FeedKind::Article),
    ("property-landing", Priority::Low, FeedKind::Article),
    ("education-landing", Priority::Low, FeedKind::Article),
    ("videos-landing", Priority::Medium, FeedKind::Video),
    ("shorts-videos", Priority::Low, FeedKind::Video),
];

const SEED_ALIASES: &[(&str, &str)] = &[
    ("SUPER HIGHLIGHT", "super-highlight"),
    ("HIGHLIGHTS", "super-highlight"),
    ("HOME", "home-landing"),
    ("TOP NEWS", "news-landing"),
    ("NEWS", "news-landing"),
    ("FMT NEWS", "fmt-news"),
    ("MALAYSIA", "fmt-news"),
    ("TOP BUSINESS", "business-landing"),
    ("BUSINESS", "business-landing"),
    ("TOP BM", "berita-landing"),
    ("BERITA", "berita-landing"),
    ("TOP WORLD", "world-landing"),
    ("WORLD", "world-landing"),
    ("TOP OPINION", "opinion-landing"),
    ("OPINION", "opinion-landing"),
    ("TOP SPORTS", "sports-landing"),
    ("SPORTS", "sports-landing"),
    ("TOP LIFESTYLE", "lifestyle-landing"),
    ("LIFESTYLE", "lifestyle-landing"),
    ("PROPERTY", "property-landing"),
    ("EDUCATION", "education-landing"),
    ("TOP VIDEOS", "videos-landing"),
    ("VIDEOS", "videos-landing"),
    ("SHORTS", "shorts-videos"),
];

impl FeedRegistry {
    /// Build from explicit descriptors; `extra_aliases` are layered over the seed aliases.
    pub fn from_parts(feeds: Vec<FeedDescriptor>, extra_aliases: &HashMap<String, String>) -> Self {
        let (videos, articles): (Vec<_>, Vec<_>) =
            feeds.into_iter().partition(|f| f.kind == FeedKind::Video);

        let mut aliases: HashMap<String, String> = SEED_ALIASES
            .iter()
            .map(|(label, key)| (label.to_string(), key.to_string()))
            .collect();
        for (label, key) in extra_aliases {
            aliases.insert(normalize(label), key.trim().to_string());
        }

        Self {
            articles,
            videos,
            aliases,
        }
    }

    /// Built-in table; URLs are `{base_url}/{key}.json`.
    pub fn default_seed(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let feeds = SEED_FEEDS
            .iter()
            .map(|(key, priority, kind)| {
                FeedDescriptor::new(key, &format!("{base}/{key}.json"), *priority, *kind)
            })
            .collect();
        Self::from_parts(feeds, &HashMap::new())
    }

    /// Lookup across both the article and the video tables.
    pub fn get(&self, key: &str) -> Option<&FeedDescriptor> {
        self.iter().find(|f| f.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.articles.iter().chain(self.videos.iter())
    }

    pub fn article_feeds(&self) -> &[FeedDescriptor] {
        &self.articles
    }

    pub fn video_feeds(&self) -> &[FeedDescriptor] {
        &self.videos
    }

    pub fn by_priority(&self, priority: Priority) -> Vec<&FeedDescriptor> {
        self.iter().filter(|f| f.priority == priority).collect()
    }

    pub fn high_priority_keys(&self) -> Vec<&str> {
        self.by_priority(Priority::High)
            .into_iter()
            .map(|f| f.key.as_str())
            .collect()
    }

    pub fn landing_feeds(&self) -> Vec<&FeedDescriptor> {
        self.iter().filter(|f| f.is_landing()).collect()
    }

    /// Non-empty groups in fetch order: high, medium, low.
    pub fn priority_groups(&self) -> Vec<(Priority, Vec<&FeedDescriptor>)> {
        group_by_priority(self.iter())
    }

    /// Resolve a UI category label to a feed key.
    pub fn normalize_label(&self, label: &str) -> String {
        let norm = normalize(label);
        if let Some(key) = self.aliases.get(&norm) {
            return key.clone();
        }
        // Already a key, or an unknown label: lower-cased passthrough.
        label.trim().to_ascii_lowercase()
    }

    pub fn len(&self) -> usize {
        self.articles.len() + self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split descriptors into non-empty priority groups, keeping declared order inside each group.
pub fn group_by_priority<'a>(
    feeds: impl IntoIterator<Item = &'a FeedDescriptor>,
) -> Vec<(Priority, Vec<&'a FeedDescriptor>)> {
    let all: Vec<&FeedDescriptor> = feeds.into_iter().collect();
    Priority::ALL
        .iter()
        .filter_map(|p| {
            let group: Vec<_> = all.iter().copied().filter(|f| f.priority == *p).collect();
            (!group.is_empty()).then_some((*p, group))
        })
        .collect()
}

/// Upper-case and collapse whitespace.
fn normalize(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
