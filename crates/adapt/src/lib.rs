// crates/adapt/src/lib.rs

pub mod core;
pub mod http;
pub mod rest;

pub use crate::core::{Context, RestError, RestRequest, RestResponse};
pub use crate::http::{build_app, AuthLayer};
pub use crate::rest::{ControllerBuilder, Hooks, ResourceController, RestEnv, RestServer};
