// crates/adapt/src/http/mod.rs

pub mod app;
pub mod auth;

pub use app::{build_app, AppState};
pub use auth::{AuthLayer, AuthMiddleware, RequestId};
