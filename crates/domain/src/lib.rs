// crates/domain/src/lib.rs

pub mod item;
pub mod resource;
pub mod security;
pub mod setting;
pub mod status;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error(transparent)]
    Password(#[from] security::password::PasswordError),
}

pub type Result<T> = std::result::Result<T, Error>;
