//! Core business logic for FhirSync.
//!
//! # Modules
//!
//! - [`batch`] - sequential runner with per-item failure isolation
//! - [`ingest`] - resource upsert and bundle persistence units
//! - [`sync`] - patient sync orchestration and statistics
//! - [`generate`] - Synthea generation pipeline
//!
//! # Sync Workflow
//!
//! 1. **Fetch**: `Patient/{id}/$everything` from the remote server
//! 2. **Open**: one unit of work per patient
//! 3. **Persist**: the bundle as an envelope, then each resource by upsert
//! 4. **Finish**: commit, or roll back everything on the first failure
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirsync::config::load_config;
//! use fhirsync::core::sync::SyncCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirsync.toml")?;
//! let coordinator = SyncCoordinator::from_config(&config).await?;
//!
//! let summary = coordinator.sync_multiple_patients(10).await?;
//! println!("Synced: {}", summary.synced);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod generate;
pub mod ingest;
pub mod sync;
