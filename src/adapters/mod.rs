//! External system integrations for FhirSync.
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`source`] - Remote FHIR R4 server (HTTP, retries, paging)
//! - [`database`] - Store abstraction, factory and unit of work
//! - [`postgresql`] - PostgreSQL store
//! - [`memory`] - Process-local store for dry runs and tests
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the core can be
//! exercised against in-process fakes. Third-party error types are mapped to
//! [`crate::domain::SyncError`] here and never cross into the core.
//!
//! # Source Adapter
//!
//! ```rust,no_run
//! use fhirsync::adapters::source::{FhirSource, FhirSourceClient};
//! use fhirsync::config::FhirSourceConfig;
//! use fhirsync::domain::PatientId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FhirSourceConfig {
//!     base_url: "https://hapi.fhir.org/baseR4".to_string(),
//!     ..Default::default()
//! };
//!
//! let client = FhirSourceClient::new(config)?;
//! let bundle = client
//!     .fetch_patient_record_set(&PatientId::new("592912")?)
//!     .await?;
//! println!("{} entries", bundle.entry_count());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
pub mod source;
