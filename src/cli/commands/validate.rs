//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the FhirSync configuration file.

use crate::cli::exit_code;
use crate::config::schema::DatabaseTarget;
use crate::config::{load_config, redact_connection_string};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  FHIR Server: {}", config.source.base_url);
        println!("  Request Timeout: {}s", config.source.timeout_seconds);
        println!("  Max Retries: {}", config.source.retry.max_retries);

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                println!("  Database Target: PostgreSQL");
                if let Some(ref pg_config) = config.postgresql {
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(&pg_config.connection_string)
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                    println!("  SSL Mode: {}", pg_config.ssl_mode);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Database Target: in-memory (nothing is persisted)");
            }
        }

        println!("  Generator Tooling: {}", config.generator.scripts_dir.display());
        println!("  Generator Output Root: {}", config.generator.output_root.display());
        println!("  Generator Region: {}", config.generator.region);
        println!();
        Ok(exit_code::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_rejects_bad_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fhirsync.toml");
        std::fs::write(
            &path,
            r#"
database_target = "oracle"

[source]
base_url = "http://localhost:8080/fhir"
"#,
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }

    #[tokio::test]
    async fn test_validate_accepts_memory_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fhirsync.toml");
        std::fs::write(
            &path,
            r#"
database_target = "memory"

[source]
base_url = "http://localhost:8080/fhir"
"#,
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::SUCCESS);
    }
}
