//! Generate command implementation
//!
//! Runs the Synthea generator and ingests the patient bundles it writes.

use crate::cli::commands::{load_run_config, print_json};
use crate::cli::{exit_code, exit_code_for};
use crate::core::generate::{GenerationOutcome, GenerationPipeline};
use clap::Args;

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Number of synthetic patients to generate
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: u32,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Dry run mode - ingest into the in-memory store, nothing is persisted
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateArgs {
    /// Execute the generate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(count = self.count, "Starting generate command");

        let config = match load_run_config(config_path, self.dry_run) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration error: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to the database");
        }

        let pipeline = match GenerationPipeline::from_config(&config).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create generation pipeline");
                eprintln!("Failed to initialize generation: {e}");
                return Ok(exit_code::CONNECTION);
            }
        };

        if !self.json {
            println!("🧬 Generating {} patient(s)...", self.count);
        }

        let outcome = match pipeline.generate_patients(self.count).await {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Generation failed");
                eprintln!("❌ Generation failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            print_json(&outcome)?;
        } else {
            print_outcome(&outcome);
        }

        Ok(if outcome.failed_files == 0 {
            exit_code::SUCCESS
        } else {
            exit_code::PARTIAL
        })
    }
}

fn print_outcome(outcome: &GenerationOutcome) {
    println!();
    println!("📊 Generation Summary");
    println!("  Transaction: {}", outcome.transaction_id);
    println!("  Patients requested: {}", outcome.count);
    println!("  Bundles stored: {}", outcome.files_ingested);
    println!("  Bundles skipped: {}", outcome.failed_files);
    println!("  Resources upserted: {}", outcome.resources_ingested);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let args = GenerateArgs {
            count: 1,
            json: true,
            dry_run: false,
        };
        let code = args.execute("/nonexistent/fhirsync.toml").await.unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}
