// crates/serve/src/store/mod.rs

pub mod mem;
pub mod seed;

use crate::query::{ItemQuery, QueryPage};
use domain::item::{Item, ItemChanges, ItemId, TermId, UserId};
use http::StatusCode;
use serde_json::Value as Json;
use thiserror::Error;

pub use mem::{InMemoryStore, StoreConfig};
pub use seed::Seed;

/// Failures reported by the storage engine.
///
/// `Insert`, `Update` and `Delete` are storage faults; everything else is a
/// validation fault raised while applying a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Could not insert item into the database.")]
    Insert,
    #[error("Could not update item in the database.")]
    Update,
    #[error("The item could not be deleted.")]
    Delete,
    #[error("Content, title, and excerpt are empty.")]
    EmptyContent,
    #[error("Invalid item ID.")]
    InvalidItem(ItemId),
    #[error("Invalid taxonomy: {0}.")]
    InvalidTaxonomy(String),
    #[error("Invalid featured media ID.")]
    InvalidFeaturedMedia,
    #[error("seed error: {0}")]
    Seed(String),
}

impl StoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Insert => "db_insert_error",
            StoreError::Update => "db_update_error",
            StoreError::Delete => "db_delete_error",
            StoreError::EmptyContent => "empty_content",
            StoreError::InvalidItem(_) => "invalid_post",
            StoreError::InvalidTaxonomy(_) => "invalid_taxonomy",
            StoreError::InvalidFeaturedMedia => "rest_invalid_featured_media",
            StoreError::Seed(_) => "seed_error",
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            StoreError::Insert | StoreError::Update | StoreError::Delete | StoreError::Seed(_)
        )
    }

    pub fn to_status(&self) -> StatusCode {
        if self.is_fault() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

/// The storage engine consumed by the REST layer.
pub trait ItemStore: Send + Sync {
    /// Run a paged query. See [`QueryPage::found`] for the empty-page rule.
    fn query(&self, q: &ItemQuery) -> Result<QueryPage, StoreError>;

    fn get(&self, id: ItemId) -> Option<Item>;

    /// Insert a new item, applying defaults. Returns the assigned id.
    fn insert(&self, changes: ItemChanges) -> Result<ItemId, StoreError>;

    /// Apply `changes` to the item named by `changes.id`.
    fn update(&self, changes: ItemChanges) -> Result<ItemId, StoreError>;

    /// Move to trash, remembering the prior status.
    fn trash(&self, id: ItemId) -> Result<Item, StoreError>;

    fn untrash(&self, id: ItemId) -> Result<Item, StoreError>;

    /// Remove permanently together with metadata and term relationships.
    fn delete(&self, id: ItemId) -> Result<Item, StoreError>;

    /// Replace the item's terms in `taxonomy`.
    fn set_terms(&self, id: ItemId, taxonomy: &str, terms: &[TermId]) -> Result<(), StoreError>;

    fn sticky_ids(&self) -> Vec<ItemId>;

    fn set_sticky(&self, id: ItemId, sticky: bool) -> Result<(), StoreError>;

    fn user_exists(&self, id: UserId) -> bool;

    /// `0` clears the featured asset.
    fn set_featured_media(&self, id: ItemId, media: ItemId) -> Result<(), StoreError>;

    fn set_format(&self, id: ItemId, format: &str) -> Result<(), StoreError>;

    fn set_template(&self, id: ItemId, template: &str) -> Result<(), StoreError>;

    /// `None` deletes the key.
    fn set_meta(&self, id: ItemId, key: &str, value: Option<Json>) -> Result<(), StoreError>;

    fn is_sticky(&self, id: ItemId) -> bool {
        self.sticky_ids().contains(&id)
    }
}
