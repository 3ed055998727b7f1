// crates/serve/src/lib.rs

pub mod query;
pub mod render;
pub mod store;

pub use query::{ItemQuery, QueryPage};
pub use render::RenderError;
pub use store::{InMemoryStore, ItemStore, Seed, StoreConfig, StoreError};
