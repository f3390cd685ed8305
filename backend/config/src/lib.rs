//! `statecast-config`: runtime configuration management.
//!
//! Provides:
//! - Typed config schema (listener, routes, stream tuning, logging)
//! - YAML loading
//! - Environment variable overrides
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, InvalidEnvVarError};
pub use io::{config_file_path, load_config};
pub use schema::{LoggingConfig, RoutesConfig, ServerConfig, StatecastConfig, StreamConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;

/// Load, apply env overrides and defaults, then validate a config file.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<StatecastConfig> {
    let config = load_unvalidated(path).await?;
    ensure_valid(&config)?;
    Ok(config)
}

/// Load a config file and apply env overrides and defaults without validating.
///
/// Lets callers set up logging from the config before validation reports anything.
pub async fn load_unvalidated(path: &Path) -> Result<StatecastConfig> {
    let config = load_config(path).await?;
    let config = apply_env_overrides(config)?;
    Ok(apply_all_defaults(config))
}

/// Log every warning and error in the validation report; fail on the first error.
pub fn ensure_valid(config: &StatecastConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("invalid configuration ({} errors): {first}", report.errors.len());
    }
    Ok(())
}
