pub mod completions;
pub mod config;
pub mod emit;
pub mod run;

use eyre::{Context, Result};

use crate::cli::Overrides;
use crate::config::{Config, Settings};

/// Merge CLI overrides into the loaded config and validate the result
pub fn resolve_settings(config: &Config, overrides: &Overrides) -> Result<Settings> {
    let mut config = config.clone();
    overrides.apply(&mut config)?;
    config.validate().context("Invalid configuration")
}

/// Runtime for the recording pipeline
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}
