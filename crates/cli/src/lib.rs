//! `trek-author` library crate.
//!
//! Exposes the manifest loader and the wizard runner for integration
//! testing. The binary entrypoint lives in `main.rs`.

pub mod error;
pub mod manifest;
pub mod runner;

pub use error::CliError;
pub use manifest::Manifest;
pub use runner::{run, Summary};
