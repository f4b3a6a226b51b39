// tests/feeds_validate.rs
//
// Raw JSON -> normalize -> validate -> merge, without any I/O.
//
// Covered:
// - a realistic home-landing payload (ads, "more" tiles, broken records,
//   duplicated section headers, numeric ids, rendered titles)
// - main list assembly across the five main keys
// - section titles survive into the main list only once per feed

use landing_feeds::feeds::merge::{build_main_list, LandingState, MAIN_FEED_KEYS};
use landing_feeds::feeds::normalize::normalize_payload;
use landing_feeds::feeds::validate::{filter_items, is_displayable};
use landing_feeds::feeds::{FeedKind, FeedResult, ItemKind};
use serde_json::json;

fn home_payload() -> Vec<serde_json::Value> {
    json!([
        { "id": "sec-top", "title": "Top Stories", "thumbnail": "-", "type": "section_title" },
        { "id": 101, "title": { "rendered": "PM tables &#8216;Budget 2027&#8217;" },
          "excerpt": "<p>Spending up</p>", "featured_image": "https://img.test/101.jpg",
          "link": "https://news.test/101" },
        { "id": "ad-1", "title": "Sponsored", "thumbnail": "https://img.test/ad.jpg", "type": "ad" },
        { "id": "102", "title": "", "thumbnail": "https://img.test/102.jpg" },
        null,
        { "id": "103", "title": "Floods recede", "thumbnail": "https://img.test/103.jpg" },
        { "id": "sec-top-2", "title": "Top Stories", "thumbnail": "-", "type": "section-title" },
        { "id": "more-1", "title": "More news", "thumbnail": "-", "type": "more" },
        { "id": "104", "title": "Ringgit firms", "thumbnail": false }
    ])
    .as_array()
    .cloned()
    .unwrap()
}

#[test]
fn home_landing_payload_is_cleaned_for_display() {
    let items = normalize_payload(FeedKind::Article, home_payload());
    // null dropped at the boundary, everything else kept raw
    assert_eq!(items.len(), 8);

    let shown = filter_items(&items);
    let ids: Vec<&str> = shown.iter().filter_map(|i| i.id.as_deref()).collect();
    assert_eq!(ids, vec!["sec-top", "101", "103"]);

    assert_eq!(shown[0].kind(), ItemKind::SectionTitle);
    assert_eq!(shown[1].title.as_deref(), Some("PM tables \u{2018}Budget 2027\u{2019}"));
    assert_eq!(shown[1].excerpt.as_deref(), Some("Spending up"));
    assert_eq!(shown[1].permalink.as_deref(), Some("https://news.test/101"));
    assert!(shown.iter().all(is_displayable));
}

#[test]
fn main_list_spans_main_keys_in_order() {
    let mut st = LandingState::default();
    let mk = |key: &str, ids: &[&str]| {
        let values = ids
            .iter()
            .map(|id| json!({ "id": id, "title": format!("t{id}"), "thumbnail": "x" }))
            .collect();
        FeedResult::new(key, normalize_payload(FeedKind::Article, values))
    };

    let replaced = st.apply(vec![
        mk("business-landing", &["b1", "shared"]),
        mk("fmt-news", &["f1"]),
        mk("super-highlight", &["s1", "shared"]),
        mk("news-landing", &[]),
        mk("sports-landing", &["x1"]),
    ]);
    // the empty news result does not occupy a filtered slot
    assert_eq!(replaced, 4);
    assert!(!st.has_filtered("news-landing"));

    let ids: Vec<&str> = st.main.iter().filter_map(|i| i.id.as_deref()).collect();
    assert_eq!(ids, vec!["s1", "shared", "f1", "b1"]);
    assert_eq!(st.main, build_main_list(&st.filtered));
    assert_eq!(MAIN_FEED_KEYS[0], "super-highlight");
}

#[test]
fn cache_reload_rebuilds_filtered_and_main() {
    let mut st = LandingState::default();
    let mut data = landing_feeds::feeds::LandingMap::new();
    data.insert(
        "home-landing".into(),
        normalize_payload(FeedKind::Article, home_payload()),
    );
    st.replace_all(data);

    assert_eq!(st.landing["home-landing"].len(), 8);
    assert_eq!(st.filtered["home-landing"].len(), 3);
    assert_eq!(st.main.len(), 3);
}
