// crates/edge/src/lib.rs

pub mod cli;

mod error;

pub use error::Error;
