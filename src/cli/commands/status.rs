//! Status command implementation
//!
//! This module implements the `status` command for displaying stored
//! resource counts per resource type.

use crate::adapters::database::create_store;
use crate::cli::commands::print_json;
use crate::cli::exit_code;
use crate::config::load_config;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreStatus<'a> {
    backend: &'a str,
    resources_by_type: BTreeMap<String, i64>,
    total_resources: i64,
    envelopes: i64,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking store status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let store = match create_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(exit_code::CONNECTION);
            }
        };

        let counts = async {
            let by_type = store.count_resources_by_kind().await?;
            let envelopes = store.count_envelopes().await?;
            Ok::<_, crate::domain::SyncError>((by_type, envelopes))
        };
        let (resources_by_type, envelopes) = match counts.await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load statistics");
                println!("   Error: {e}");
                return Ok(exit_code::FATAL);
            }
        };

        let status = StoreStatus {
            backend: store.backend_name(),
            total_resources: resources_by_type.values().sum(),
            resources_by_type,
            envelopes,
        };

        if self.json {
            print_json(&status)?;
            return Ok(exit_code::SUCCESS);
        }

        println!("📊 Store Status ({})", status.backend);
        println!();

        if status.resources_by_type.is_empty() {
            println!("No resources stored yet.");
            println!("Run 'fhirsync sync-patients' or 'fhirsync generate' to ingest data.");
            return Ok(exit_code::SUCCESS);
        }

        println!("{:<40} {:>10}", "Resource Type", "Count");
        println!("{}", "-".repeat(51));
        for (kind, count) in &status.resources_by_type {
            println!("{kind:<40} {count:>10}");
        }
        println!("{}", "-".repeat(51));
        println!("{:<40} {:>10}", "Total", status.total_resources);
        println!("{:<40} {:>10}", "Envelopes", status.envelopes);
        println!();
        Ok(exit_code::SUCCESS)
    }
}
