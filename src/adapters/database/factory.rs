//! Store factory
//!
//! This module provides the factory function that creates a store based on
//! configuration.

use crate::adapters::database::traits::ResourceStore;
use crate::adapters::memory::InMemoryStore;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLStore};
use crate::config::schema::FhirSyncConfig;
use crate::domain::{Result, SyncError};
use std::sync::Arc;

/// Create a store based on the configuration
///
/// Dry runs and `database_target = "memory"` get an [`InMemoryStore`]. A
/// PostgreSQL store is checked for connectivity and has its schema created
/// before it is returned.
///
/// # Errors
///
/// Returns `SyncError::Configuration` if the PostgreSQL section is missing,
/// or the connection/schema error if the database cannot be prepared.
pub async fn create_store(config: &FhirSyncConfig) -> Result<Arc<dyn ResourceStore>> {
    if !config.uses_durable_store() {
        tracing::info!(
            dry_run = config.application.dry_run,
            "Using in-memory store; nothing will be persisted"
        );
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let pg_config = config.postgresql.as_ref().ok_or_else(|| {
        SyncError::Configuration(
            "postgresql configuration is required when database_target = 'postgresql'"
                .to_string(),
        )
    })?;

    tracing::info!("Creating PostgreSQL store");
    let client = PostgreSQLClient::new(pg_config.clone()).await?;
    let store = PostgreSQLStore::new(client);

    store.test_connection().await?;
    store.ensure_schema().await?;

    Ok(Arc::new(store))
}
