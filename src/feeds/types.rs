// src/feeds/types.rs
//! Canonical item record shared by every feed, plus the lenient serde helpers
//! used to read both remote payloads and the on-disk cache.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Feed key -> items in display order.
pub type LandingMap = HashMap<String, Vec<Item>>;

/// Discriminant carried in the JSON `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Article,
    Video,
    SectionTitle,
    Ad,
    More,
    Other,
}

impl ItemKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "article" | "post" => Self::Article,
            "video" => Self::Video,
            "section-title" | "sectiontitle" => Self::SectionTitle,
            "ad" | "ads" | "advertisement" => Self::Ad,
            "more" | "view-more" | "load-more" => Self::More,
            _ => Self::Other,
        }
    }

    /// Ad slots and "more" links are layout placeholders, never content.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::Ad | Self::More)
    }
}

/// Article-like record. Every field is optional so that invalid records can be
/// represented long enough for the validator to reject them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<ItemKind>,
}

impl Item {
    /// Minimal displayable article (id + title + thumbnail).
    pub fn new(id: impl Into<String>, title: impl Into<String>, thumbnail: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            thumbnail: Some(thumbnail.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind(&self) -> ItemKind {
        self.kind.unwrap_or(ItemKind::Article)
    }
}

/// Outcome of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedResult {
    pub key: String,
    pub items: Vec<Item>,
}

impl FeedResult {
    pub fn new(key: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            key: key.into(),
            items,
        }
    }
}

/// Strings are trimmed (empty -> None), numbers are stringified, WordPress-style
/// `{ "rendered": ... }` objects are unwrapped, anything else is None.
pub(crate) fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("rendered").and_then(value_to_string),
        _ => None,
    }
}

pub(crate) fn lenient_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_string))
}

fn lenient_kind<'de, D>(d: D) -> Result<Option<ItemKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(d)?.map(|s| ItemKind::parse(&s)))
}

/// Decode a JSON array into items, dropping nulls and non-object entries.
pub fn items_from_values(values: Vec<Value>) -> Vec<Item> {
    values
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Cache `data` reader: tolerates nulls inside arrays and non-array slots.
pub(crate) fn lenient_landing_map<'de, D>(d: D) -> Result<LandingMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Value>>::deserialize(d)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, v)| match v {
            Value::Array(values) => Some((key, items_from_values(values))),
            _ => None,
        })
        .collect())
}
