//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::cli::exit_code;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fhirsync.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing FhirSync configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(exit_code::CONFIGURATION);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set database_target to 'postgresql' or 'memory'");
                println!("  3. Create a .env file with FHIRSYNC_DATABASE_URL");
                println!("  4. Validate configuration: fhirsync validate-config");
                println!("  5. Sync a patient: fhirsync sync-patient <ID>");
                println!();
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(exit_code::FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# FhirSync Configuration File

environment = "development"

# Store backend (postgresql or memory)
database_target = "postgresql"

[application]
log_level = "info"
dry_run = false

[source]
base_url = "https://hapi.fhir.org/baseR4"
timeout_seconds = 60
tls_verify = true

[source.retry]
max_retries = 3

[postgresql]
connection_string = "${FHIRSYNC_DATABASE_URL}"
max_connections = 10

[generator]
scripts_dir = "/app/scripts"
output_root = "/app"
region = "Massachusetts"

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# FhirSync Configuration File
# FHIR R4 sync and ingestion engine
#
# Any value can be overridden from the environment with FHIRSYNC__SECTION__KEY,
# e.g. FHIRSYNC__SOURCE__BASE_URL or FHIRSYNC__APPLICATION__DRY_RUN.

# ============================================================================
# Environment
# ============================================================================
# development | staging | production
# Production refuses source.tls_verify = false.
environment = "development"

# ============================================================================
# Store Selection
# ============================================================================
# postgresql: durable store (requires the [postgresql] section)
# memory: process-local store, nothing survives the run
database_target = "postgresql"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode: write to the in-memory store instead of the database
dry_run = false

# ============================================================================
# Remote FHIR Server
# ============================================================================
[source]
# Base URL of the FHIR R4 endpoint
base_url = "https://hapi.fhir.org/baseR4"

# Request timeout in seconds
timeout_seconds = 60

# TLS certificate verification
tls_verify = true

# Maximum number of pages followed for one patient's $everything
max_pages = 20

[source.retry]
# Retries after the first attempt (connection failures, timeouts, 5xx)
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# ============================================================================
# PostgreSQL
# ============================================================================
[postgresql]
# postgresql://[user[:password]@][host][:port][/dbname]
connection_string = "${FHIRSYNC_DATABASE_URL}"

# Connection pool settings
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60

# disable | prefer | require
ssl_mode = "prefer"

# ============================================================================
# Synthea Generator
# ============================================================================
[generator]
# Directory holding the generator tooling; must exist
scripts_dir = "/app/scripts"

# Artifact looked up inside scripts_dir, then at fallback_artifact
artifact = "synthea-with-dependencies.jar"
fallback_artifact = "synthea-with-dependencies.jar"

# Program and arguments that run the artifact
launcher = "java"
launcher_args = ["-jar"]

# Each job writes into <output_root>/synthea_output_<uuid>, removed afterwards
output_root = "/app"

# Region passed last on the generator command line
region = "Massachusetts"

# Extra generator arguments, e.g. ["-s", "42"] for a fixed seed
extra_args = []

# Upsert every generated resource, not only the bundle envelope
ingest_resources = true

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "/var/log/fhirsync"

# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}
