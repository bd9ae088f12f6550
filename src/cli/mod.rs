//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for FhirSync using clap.

pub mod commands;

use crate::domain::SyncError;
use clap::{Parser, Subcommand};

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// The run completed but some patients or files failed
    pub const PARTIAL: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const CONNECTION: i32 = 4;
    pub const FATAL: i32 = 5;
    pub const INTERRUPTED: i32 = 130;
}

/// Exit code for an error that aborted a command
pub fn exit_code_for(error: &SyncError) -> i32 {
    match error {
        SyncError::Configuration(_) => exit_code::CONFIGURATION,
        e if e.is_connection() => exit_code::CONNECTION,
        _ => exit_code::FATAL,
    }
}

/// FhirSync - FHIR sync and ingestion engine
#[derive(Parser, Debug)]
#[command(name = "fhirsync")]
#[command(version, about, long_about = None)]
#[command(author = "FhirSync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhirsync.toml", env = "FHIRSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIRSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync one patient's complete record set from the FHIR server
    SyncPatient(commands::sync::SyncPatientArgs),

    /// Sync patients listed by the FHIR server's patient directory
    SyncPatients(commands::sync::SyncPatientsArgs),

    /// Generate synthetic patients with Synthea and ingest them
    Generate(commands::generate::GenerateArgs),

    /// Show stored resource counts
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
