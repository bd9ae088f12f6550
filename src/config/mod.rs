//! Configuration management for FhirSync.
//!
//! FhirSync reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Environment overrides (`FHIRSYNC__SECTION__KEY`)
//! - Default values for optional settings
//! - Validation of the active sections
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhirsync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirsync.toml")?;
//! println!("FHIR server: {}", config.source.base_url);
//! println!("Generator tooling: {}", config.generator.scripts_dir.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "development"
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [source]
//! base_url = "https://hapi.fhir.org/baseR4"
//! timeout_seconds = 60
//!
//! [source.retry]
//! max_retries = 3
//!
//! [postgresql]
//! connection_string = "${FHIRSYNC_DATABASE_URL}"
//!
//! [generator]
//! scripts_dir = "/app/scripts"
//! output_root = "/app"
//! ```
//!
//! # Environment Overrides
//!
//! ```bash
//! export FHIRSYNC__SOURCE__BASE_URL="https://fhir.internal/r4"
//! export FHIRSYNC__APPLICATION__DRY_RUN=true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, DatabaseTarget, Environment, FhirSourceConfig, FhirSyncConfig,
    GeneratorConfig, LoggingConfig, PostgreSQLConfig, RetryConfig,
};
pub use secret::{redact_connection_string, secret_string, SecretString, SecretValue};
