// src/feeds/normalize.rs
//! Fetch-boundary normalization: every external record shape is converted into
//! the canonical [`Item`] before it reaches the validator or the mapping.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::feeds::registry::FeedKind;
use crate::feeds::types::{value_to_string, Item, ItemKind};

/// Record as published by an article feed.
#[derive(Debug, Clone, Default)]
pub struct ArticleRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub date: Option<String>,
    pub thumbnail: Option<String>,
    pub permalink: Option<String>,
    pub kind: Option<String>,
}

impl ArticleRecord {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            id: pick(m, &["id"]),
            title: pick(m, &["title"]),
            excerpt: pick(m, &["excerpt"]),
            date: pick(m, &["date"]),
            thumbnail: pick(m, &["thumbnail", "featured_image", "image"]),
            permalink: pick(m, &["permalink", "link", "url"]),
            kind: pick(m, &["type"]),
        }
    }
}

/// Record as published by a video feed.
#[derive(Debug, Clone, Default)]
pub struct VideoRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub thumbnail: Option<String>,
    pub permalink: Option<String>,
}

impl VideoRecord {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            id: pick(m, &["id", "video_id", "videoId"]),
            title: pick(m, &["title"]),
            description: pick(m, &["description", "excerpt"]),
            date: pick(m, &["date", "publishedAt", "published_at"]),
            thumbnail: pick(m, &["thumbnail", "thumbnail_url", "image"]),
            permalink: pick(m, &["permalink", "link", "url"]),
        }
    }
}

/// First usable value among `keys`, in order.
fn pick(m: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| m.get(*k).and_then(value_to_string))
}

/// External item shapes, selected by the descriptor's feed kind.
#[derive(Debug, Clone)]
pub enum RawItem {
    Article(ArticleRecord),
    Video(VideoRecord),
}

impl RawItem {
    /// `None` for nulls and scalars.
    pub fn from_value(kind: FeedKind, v: &Value) -> Option<Self> {
        let map = v.as_object()?;
        Some(match kind {
            FeedKind::Article => RawItem::Article(ArticleRecord::from_map(map)),
            FeedKind::Video => RawItem::Video(VideoRecord::from_map(map)),
        })
    }

    pub fn into_item(self) -> Item {
        match self {
            RawItem::Article(a) => Item {
                id: a.id,
                title: a.title.as_deref().map(clean_text).filter(|s| !s.is_empty()),
                excerpt: a.excerpt.as_deref().map(clean_text).filter(|s| !s.is_empty()),
                date: a.date,
                thumbnail: a.thumbnail,
                permalink: a.permalink,
                kind: a.kind.as_deref().map(ItemKind::parse),
            },
            RawItem::Video(v) => {
                let extracted = v.permalink.as_deref().and_then(extract_video_id);
                let id = match (&v.id, &extracted) {
                    (Some(id), _) => id.clone(),
                    (None, Some(vid)) => vid.clone(),
                    (None, None) => placeholder_video_id(&v),
                };
                let thumbnail = v.thumbnail.or_else(|| {
                    extracted
                        .as_deref()
                        .map(|vid| format!("https://img.youtube.com/vi/{vid}/hqdefault.jpg"))
                });
                Item {
                    id: Some(id),
                    title: v.title.as_deref().map(clean_text).filter(|s| !s.is_empty()),
                    excerpt: v.description.as_deref().map(clean_text).filter(|s| !s.is_empty()),
                    date: v.date,
                    thumbnail,
                    permalink: v.permalink,
                    kind: Some(ItemKind::Video),
                }
            }
        }
    }
}

/// Convert a decoded JSON array into canonical items for the given feed kind.
pub fn normalize_payload(kind: FeedKind, values: Vec<Value>) -> Vec<Item> {
    values
        .into_iter()
        .filter_map(|v| RawItem::from_value(kind, &v))
        .map(RawItem::into_item)
        .collect()
}

/// Pull an 11-character video id out of watch, short-link, embed or shorts URLs.
pub fn extract_video_id(permalink: &str) -> Option<String> {
    static RE_VIDEO_ID: OnceCell<Regex> = OnceCell::new();
    let re = RE_VIDEO_ID.get_or_init(|| {
        Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/shorts/)(?P<id>[A-Za-z0-9_-]{11})")
            .expect("video id regex")
    });
    re.captures(permalink)
        .and_then(|c| c.name("id"))
        .map(|m| m.as_str().to_string())
}

/// Stable synthetic id for videos whose permalink carries none.
fn placeholder_video_id(v: &VideoRecord) -> String {
    let seed = v
        .permalink
        .as_deref()
        .or(v.title.as_deref())
        .unwrap_or_default();
    let digest = Sha256::digest(seed.as_bytes());
    let hex: String = digest[..6].iter().map(|b| format!("{b:02x}")).collect();
    format!("video-{hex}")
}

/// Decode HTML entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&stripped, " ").trim().to_string()
}
