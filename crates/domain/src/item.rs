// crates/domain/src/item.rs

use crate::status::Status;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

pub type ItemId = u64;
pub type UserId = u64;
pub type TermId = u64;

/// Open/closed switch used by comment and ping status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    #[default]
    Open,
    Closed,
}

impl Toggle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Toggle::Open => "open",
            Toggle::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Toggle::Open),
            "closed" => Some(Toggle::Closed),
            _ => None,
        }
    }
}

/// A persisted instance of a resource type.
///
/// `date` is site-local time. `date_gmt` is `None` for drafts that were
/// never given an explicit date; the codec derives it from `date` and the
/// site offset when it has to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Status,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub date_gmt: Option<NaiveDateTime>,
    pub modified: NaiveDateTime,
    pub modified_gmt: NaiveDateTime,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: ItemId,
    #[serde(default)]
    pub author: UserId,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub comment_status: Toggle,
    #[serde(default)]
    pub ping_status: Toggle,
    #[serde(default)]
    pub featured_media: ItemId,
    #[serde(default)]
    pub template: String,
    /// Empty means the default ("standard") format.
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub meta: BTreeMap<String, Json>,
    /// Term ids keyed by taxonomy name.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<TermId>>,
    /// Status held before the item was trashed.
    #[serde(default)]
    pub trashed_from: Option<Status>,
}

impl Item {
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn terms_in(&self, taxonomy: &str) -> &[TermId] {
        self.terms.get(taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Column-level write set produced by decoding a request.
///
/// `None` leaves the column untouched on update and lets the store apply its
/// default on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub id: Option<ItemId>,
    pub kind: Option<String>,
    pub status: Option<Status>,
    pub date: Option<NaiveDateTime>,
    pub date_gmt: Option<NaiveDateTime>,
    pub slug: Option<String>,
    pub parent: Option<ItemId>,
    pub author: Option<UserId>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub password: Option<String>,
    pub menu_order: Option<i64>,
    pub comment_status: Option<Toggle>,
    pub ping_status: Option<Toggle>,
}

impl ItemChanges {
    /// True when the write touches any textual body field.
    pub fn touches_body(&self) -> bool {
        self.title.is_some() || self.content.is_some() || self.excerpt.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_json() -> Json {
        json!({
            "id": 7,
            "type": "post",
            "status": "publish",
            "date": "2024-03-01T10:00:00",
            "modified": "2024-03-01T10:00:00",
            "modified_gmt": "2024-03-01T09:00:00",
            "title": "Hello",
            "terms": { "category": [1, 4] }
        })
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let item: Item = serde_json::from_value(seed_json()).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.kind, "post");
        assert_eq!(item.status, Status::Publish);
        assert!(item.date_gmt.is_none());
        assert_eq!(item.comment_status, Toggle::Open);
        assert!(item.format.is_empty());
        assert!(!item.has_password());
        assert_eq!(item.terms_in("category"), &[1, 4]);
        assert!(item.terms_in("post_tag").is_empty());
    }

    #[test]
    fn toggle_parses_only_known_values() {
        assert_eq!(Toggle::parse("closed"), Some(Toggle::Closed));
        assert_eq!(Toggle::parse("open").map(|t| t.as_str()), Some("open"));
        assert_eq!(Toggle::parse("maybe"), None);
    }

    #[test]
    fn changes_report_body_touches() {
        let mut c = ItemChanges::default();
        assert!(!c.touches_body());
        c.excerpt = Some(String::new());
        assert!(c.touches_body());
    }
}
