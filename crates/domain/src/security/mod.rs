// crates/domain/src/security/mod.rs

pub mod actor;
pub mod caps;
pub mod password;

pub use actor::{Actor, Principal, Role};
pub use caps::{Capability, CapabilityCheck, Primitive, RoleCapabilities};
