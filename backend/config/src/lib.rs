//! `regionhop-config`: coordinator configuration management.
//!
//! Provides:
//! - Typed config schema (handoff timings, static grid, logging)
//! - YAML loading with first-run defaults
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Schema validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{GridSettings, HandoffSettings, LoggingConfig, RegionEntry, RegionHopConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, apply env substitution, apply defaults and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged; the caller decides whether errors are fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(RegionHopConfig, ValidationReport)> {
    let config = match io::load_raw(path).await? {
        Some(value) => {
            let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
            serde_json::from_value(value)
                .context("Failed to deserialize config after env substitution")?
        }
        None => RegionHopConfig::default(),
    };

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok((apply_all_defaults(config), report))
}
