// FhirSync - FHIR synchronization and ingestion engine
// Copyright (c) 2025 FhirSync Contributors
// Licensed under the MIT License

//! # FhirSync - FHIR sync and ingestion engine
//!
//! FhirSync pulls clinical records in FHIR R4 JSON from a remote FHIR server,
//! or produces them with the Synthea generator, and stores them in a
//! relational store.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Syncing** a patient's complete record set (`Patient/{id}/$everything`)
//! - **Bulk syncing** patients from the server's directory with per-patient
//!   failure isolation
//! - **Generating** synthetic patients and ingesting the produced bundles
//! - **Reporting** stored resource counts per resource type
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (ingest units, sync, generation)
//! - [`adapters`] - External integrations (FHIR server, stores)
//! - [`domain`] - Core domain types and errors
//! - [`fhir`] - FHIR document model and codec
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhirsync::config::load_config;
//! use fhirsync::core::sync::SyncCoordinator;
//! use fhirsync::domain::PatientId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fhirsync.toml")?;
//!     let coordinator = SyncCoordinator::from_config(&config).await?;
//!
//!     let processed = coordinator.sync_patient(&PatientId::new("592912")?).await?;
//!     println!("Stored {processed} resources");
//!     Ok(())
//! }
//! ```
//!
//! ## Atomicity
//!
//! Every patient sync and every generated file is stored inside one
//! [`adapters::database::UnitOfWork`]: the envelope and all resources are
//! committed together, or nothing is.
//!
//! ## Error Handling
//!
//! All library operations return [`domain::Result`], whose error type is
//! [`domain::SyncError`]. `anyhow` is only used at the CLI boundary.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod fhir;
pub mod logging;
