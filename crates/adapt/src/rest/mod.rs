// crates/adapt/src/rest/mod.rs

pub mod args;
pub mod codec;
pub mod controller;
pub mod dates;
pub mod fields;
pub mod hooks;
pub mod links;
pub mod params;
pub mod permission;
pub mod schema;
pub mod server;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ControllerBuilder, ResourceController, RestEnv};
pub use fields::AdditionalField;
pub use hooks::Hooks;
pub use server::RestServer;
