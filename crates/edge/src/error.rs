// crates/edge/src/error.rs

use adapt::RestError;
use domain::security::password::PasswordError;
use serve::StoreError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] domain::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("controller error: {0}")]
    Rest(#[from] RestError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),
}
