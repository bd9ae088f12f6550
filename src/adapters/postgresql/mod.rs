//! PostgreSQL store
//!
//! Durable backend storing resources in `fhir_resources` and envelopes in
//! `fhir_bundles`, both as JSONB documents.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLStore;
pub use client::PostgreSQLClient;
pub use models::{PostgreSQLEnvelope, PostgreSQLResource};
