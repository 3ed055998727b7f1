// crates/adapt/src/core/mod.rs

pub mod context;
pub mod error;

pub use context::{build_query, parse_query, Context, LinkSet, LinkTarget, Params, RestRequest, RestResponse};
pub use error::RestError;
