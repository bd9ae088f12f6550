//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod generate;
pub mod init;
pub mod status;
pub mod sync;
pub mod validate;

use crate::config::{load_config, FhirSyncConfig};

/// Load and validate the configuration for a command that touches a store
///
/// `--dry-run` on the command line wins over the file.
pub(crate) fn load_run_config(config_path: &str, dry_run: bool) -> Result<FhirSyncConfig, String> {
    let mut config = load_config(config_path).map_err(|e| e.to_string())?;

    if dry_run {
        tracing::info!("Enabling dry-run mode from CLI");
        config.application.dry_run = true;
    }

    config.validate()?;
    Ok(config)
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
