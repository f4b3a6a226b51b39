// src/feeds/merge.rs
//! Merger: folds fetch results into the landing mapping, keeps the filtered
//! mapping and derives the deduplicated main list.

use serde::Serialize;
use std::collections::HashSet;

use crate::feeds::types::{FeedResult, Item, LandingMap};
use crate::feeds::validate::filter_items;

/// Feeds concatenated (in this order) into the main list.
pub const MAIN_FEED_KEYS: [&str; 5] = [
    "super-highlight",
    "home-landing",
    "news-landing",
    "fmt-news",
    "business-landing",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct LandingState {
    /// Normalized fetch results, as received.
    pub landing: LandingMap,
    /// Validator output per key; only ever replaced by a non-empty result.
    pub filtered: LandingMap,
    /// Derived from `filtered`; never persisted.
    pub main: Vec<Item>,
}

impl LandingState {
    /// Apply a batch of results and recompute the main list once.
    /// Returns the number of keys whose filtered slot was replaced.
    pub fn apply<I>(&mut self, results: I) -> usize
    where
        I: IntoIterator<Item = FeedResult>,
    {
        let mut replaced = 0;
        for r in results {
            if self.store(r) {
                replaced += 1;
            }
        }
        self.recompute_main();
        replaced
    }

    /// Single-key update. `landing[key]` is always overwritten; the filtered slot
    /// and the main list only change when the filtered result is non-empty.
    pub fn apply_one(&mut self, result: FeedResult) -> bool {
        let replaced = self.store(result);
        if replaced {
            self.recompute_main();
        }
        replaced
    }

    /// Install a mapping loaded from cache.
    pub fn replace_all(&mut self, data: LandingMap) {
        self.filtered = data
            .iter()
            .filter_map(|(k, v)| {
                let f = filter_items(v);
                (!f.is_empty()).then(|| (k.clone(), f))
            })
            .collect();
        self.landing = data;
        self.recompute_main();
    }

    pub fn has_filtered(&self, key: &str) -> bool {
        self.filtered.get(key).is_some_and(|v| !v.is_empty())
    }

    fn store(&mut self, r: FeedResult) -> bool {
        let filtered = filter_items(&r.items);
        let replaced = !filtered.is_empty();
        if replaced {
            self.filtered.insert(r.key.clone(), filtered);
        }
        self.landing.insert(r.key, r.items);
        replaced
    }

    fn recompute_main(&mut self) {
        self.main = build_main_list(&self.filtered);
    }
}

/// Concatenate `MAIN_FEED_KEYS` in declared order, deduplicating by id
/// (first occurrence wins) and keeping each feed's internal order.
pub fn build_main_list(filtered: &LandingMap) -> Vec<Item> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for key in MAIN_FEED_KEYS {
        let Some(items) = filtered.get(key) else {
            continue;
        };
        for it in items {
            let Some(id) = it.id.as_deref() else {
                continue;
            };
            if seen.insert(id) {
                out.push(it.clone());
            }
        }
    }
    out
}
