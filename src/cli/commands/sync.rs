//! Sync command implementations
//!
//! `sync-patient` stores one patient's `$everything` record set;
//! `sync-patients` walks the server's patient directory.

use crate::cli::commands::{load_run_config, print_json};
use crate::cli::{exit_code, exit_code_for};
use crate::config::FhirSyncConfig;
use crate::core::sync::{SyncCoordinator, SyncRunSummary};
use crate::domain::{PatientId, SyncError};
use clap::Args;
use serde::Serialize;

/// Arguments for the sync-patient command
#[derive(Args, Debug)]
pub struct SyncPatientArgs {
    /// Id of the patient on the FHIR server
    pub patient_id: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Dry run mode - sync into the in-memory store, nothing is persisted
    #[arg(long)]
    pub dry_run: bool,
}

/// Result of a single patient sync as printed with `--json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientSyncReport<'a> {
    status: &'a str,
    patient_id: &'a str,
    resources_processed: usize,
}

impl SyncPatientArgs {
    /// Execute the sync-patient command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(patient_id = %self.patient_id, "Starting sync-patient command");

        let patient_id = match PatientId::new(self.patient_id.clone()) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid patient id: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let coordinator = match build_coordinator(config_path, self.dry_run).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        match coordinator.sync_patient(&patient_id).await {
            Ok(processed) => {
                if self.json {
                    print_json(&PatientSyncReport {
                        status: "success",
                        patient_id: patient_id.as_str(),
                        resources_processed: processed,
                    })?;
                } else {
                    println!("✅ Synced patient {patient_id}: {processed} resource(s) stored");
                }
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                tracing::error!(patient_id = %patient_id, error = %e, "Patient sync failed");
                eprintln!("❌ Failed to sync patient {patient_id}: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

/// Arguments for the sync-patients command
#[derive(Args, Debug)]
pub struct SyncPatientsArgs {
    /// Maximum number of patients to sync
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Dry run mode - sync into the in-memory store, nothing is persisted
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncPatientsArgs {
    /// Execute the sync-patients command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(count = self.count, "Starting sync-patients command");

        let coordinator = match build_coordinator(config_path, self.dry_run).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let summary = match coordinator.sync_multiple_patients(self.count).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Bulk sync failed");
                eprintln!("❌ Bulk sync failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            print_json(&summary)?;
        } else {
            print_summary(&summary);
        }

        Ok(if summary.is_successful() {
            exit_code::SUCCESS
        } else {
            exit_code::PARTIAL
        })
    }
}

/// Build a coordinator, or the exit code to stop with
async fn build_coordinator(config_path: &str, dry_run: bool) -> Result<SyncCoordinator, i32> {
    let config: FhirSyncConfig = match load_run_config(config_path, dry_run) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration error: {e}");
            return Err(exit_code::CONFIGURATION);
        }
    };

    if config.application.dry_run {
        println!("🔍 DRY RUN MODE - No data will be written to the database");
    }

    SyncCoordinator::from_config(&config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create sync coordinator");
        eprintln!("Failed to initialize sync: {e}");
        match e {
            SyncError::Configuration(_) => exit_code::CONFIGURATION,
            _ => exit_code::CONNECTION,
        }
    })
}

fn print_summary(summary: &SyncRunSummary) {
    println!();
    println!("📊 Bulk Sync Summary");
    println!("  Requested: {}", summary.requested);
    println!("  Synced: {}", summary.synced);
    println!("  Failed: {}", summary.failed);
    println!("  Resources: {}", summary.total_resources);
    println!("  Duration: {} ms", summary.duration_ms);

    if !summary.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &summary.failures {
            println!("  ❌ {}: {}", failure.patient_id, failure.message);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_sync_report_json() {
        let report = PatientSyncReport {
            status: "success",
            patient_id: "592912",
            resources_processed: 3,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["patientId"], "592912");
        assert_eq!(value["resourcesProcessed"], 3);
    }

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let args = SyncPatientsArgs {
            count: 1,
            json: false,
            dry_run: true,
        };
        let code = args.execute("/nonexistent/fhirsync.toml").await.unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }

    #[tokio::test]
    async fn test_blank_patient_id_is_rejected() {
        let args = SyncPatientArgs {
            patient_id: "  ".to_string(),
            json: false,
            dry_run: true,
        };
        let code = args.execute("/nonexistent/fhirsync.toml").await.unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}
