// src/feeds/validate.rs
use metrics::counter;
use std::collections::HashSet;

use crate::feeds::types::{Item, ItemKind};

/// An item is displayable when it has an id, a title and a thumbnail and is not
/// an ad or "more" placeholder.
pub fn is_displayable(item: &Item) -> bool {
    item.id.is_some()
        && item.title.is_some()
        && item.thumbnail.is_some()
        && !item.kind().is_placeholder()
}

/// Order-preserving filter. Section-title markers are additionally deduplicated
/// by title within the pass (first occurrence wins).
pub fn filter_items(items: &[Item]) -> Vec<Item> {
    let mut seen_titles: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());

    for it in items {
        if !is_displayable(it) {
            continue;
        }
        if it.kind() == ItemKind::SectionTitle {
            let title = it.title.as_deref().unwrap_or_default();
            if !seen_titles.insert(title) {
                continue;
            }
        }
        out.push(it.clone());
    }

    let dropped = items.len() - out.len();
    if dropped > 0 {
        counter!("feeds_items_dropped_total").increment(dropped as u64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_thumb(id: &str) -> Item {
        Item {
            id: Some(id.into()),
            ..Item::default()
        }
    }

    #[test]
    fn drops_records_missing_required_fields() {
        let items = vec![Item::new("1", "A", "x"), missing_thumb("2")];
        let out = filter_items(&items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn drops_placeholders() {
        let items = vec![
            Item::new("ad-1", "Sponsored", "x").with_kind(ItemKind::Ad),
            Item::new("2", "Story", "x"),
            Item::new("more-1", "More", "x").with_kind(ItemKind::More),
        ];
        let out = filter_items(&items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn section_titles_are_deduplicated_first_wins() {
        let items = vec![
            Item::new("s1", "Top Stories", "x").with_kind(ItemKind::SectionTitle),
            Item::new("1", "Top Stories", "x"),
            Item::new("s2", "Top Stories", "x").with_kind(ItemKind::SectionTitle),
            Item::new("s3", "Business", "x").with_kind(ItemKind::SectionTitle),
        ];
        let ids: Vec<_> = filter_items(&items)
            .into_iter()
            .filter_map(|i| i.id)
            .collect();
        // regular articles sharing a section title are untouched
        assert_eq!(ids, vec!["s1", "1", "s3"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let items = vec![
            Item::new("1", "A", "x"),
            missing_thumb("2"),
            Item::new("s", "Sec", "x").with_kind(ItemKind::SectionTitle),
            Item::new("s", "Sec", "x").with_kind(ItemKind::SectionTitle),
            Item::new("ad", "Ad", "x").with_kind(ItemKind::Ad),
        ];
        let once = filter_items(&items);
        assert_eq!(filter_items(&once), once);
    }
}
