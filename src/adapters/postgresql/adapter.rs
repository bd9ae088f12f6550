//! PostgreSQL adapter implementing the store traits
//!
//! Each [`StoreSession`] pins one pooled connection and runs an explicit
//! `BEGIN` / `COMMIT` transaction on it. A session dropped while its
//! transaction is still open detaches the connection from the pool and closes
//! it, which makes the server abort the transaction.

use crate::adapters::database::traits::{ResourceStore, StoreSession};
use crate::adapters::postgresql::client::{db_error, PostgreSQLClient};
use crate::adapters::postgresql::models::{PostgreSQLEnvelope, PostgreSQLResource};
use crate::domain::{ClinicalResource, Result, SyncEnvelope, SyncError};
use async_trait::async_trait;
use deadpool_postgres::Object;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_postgres::types::Json;

const INSERT_RESOURCE: &str = r#"
    INSERT INTO fhir_resources (
        fhir_id, resource_type, resource_data, version_id, last_updated, sync_date
    )
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (fhir_id) DO UPDATE SET
        resource_data = EXCLUDED.resource_data,
        last_updated = EXCLUDED.last_updated,
        sync_date = EXCLUDED.sync_date
"#;

const UPDATE_RESOURCE: &str = r#"
    UPDATE fhir_resources
    SET resource_data = $2, last_updated = $3, sync_date = $4
    WHERE id = $1
"#;

const INSERT_ENVELOPE: &str = r#"
    INSERT INTO fhir_bundles (
        bundle_type, patient_id, bundle_data, total_resources, query_params, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

/// PostgreSQL implementation of [`ResourceStore`]
pub struct PostgreSQLStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStore {
    /// Create a new PostgreSQL store
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl ResourceStore for PostgreSQLStore {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        let connection = self.client.get_connection().await?;
        connection
            .batch_execute("BEGIN")
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let session = PostgreSQLSession {
            connection: Some(connection),
        };
        // From here on a failure drops the session, which aborts the transaction
        session
            .connection()?
            .batch_execute(&self.client.statement_timeout_sql(true))
            .await
            .map_err(|e| db_error("Failed to set statement timeout", e))?;

        Ok(Box::new(session))
    }

    async fn count_resources_by_kind(&self) -> Result<BTreeMap<String, i64>> {
        let rows = self
            .client
            .query(
                "SELECT resource_type, COUNT(*) FROM fhir_resources GROUP BY resource_type",
                &[],
            )
            .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let kind: String = row
                .try_get(0)
                .map_err(|e| db_error("Invalid resource_type column", e))?;
            let count: i64 = row
                .try_get(1)
                .map_err(|e| db_error("Invalid count column", e))?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }

    async fn count_envelopes(&self) -> Result<i64> {
        let rows = self
            .client
            .query("SELECT COUNT(*) FROM fhir_bundles", &[])
            .await?;

        match rows.first() {
            Some(row) => row
                .try_get(0)
                .map_err(|e| db_error("Invalid count column", e)),
            None => Ok(0),
        }
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}

struct PostgreSQLSession {
    connection: Option<Object>,
}

impl PostgreSQLSession {
    fn connection(&self) -> Result<&Object> {
        self.connection
            .as_ref()
            .ok_or_else(|| SyncError::Persistence("transaction already finished".to_string()))
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> Result<()> {
        let connection = self
            .connection
            .take()
            .ok_or_else(|| SyncError::Persistence("transaction already finished".to_string()))?;

        match connection.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Connection state is unknown; never hand it back to the pool
                drop(Object::take(connection));
                Err(db_error(&format!("{statement} failed"), e))
            }
        }
    }
}

impl Drop for PostgreSQLSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::debug!("Closing connection with an unfinished transaction");
            drop(Object::take(connection));
        }
    }
}

#[async_trait]
impl StoreSession for PostgreSQLSession {
    async fn find_resource_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<ClinicalResource>> {
        let query = format!(
            "SELECT {} FROM fhir_resources WHERE fhir_id = $1",
            PostgreSQLResource::COLUMNS
        );
        let row = self
            .connection()?
            .query_opt(&query, &[&external_id])
            .await
            .map_err(|e| db_error("Resource lookup failed", e))?;

        row.map(|row| PostgreSQLResource::from_row(&row).map(PostgreSQLResource::into_domain))
            .transpose()
    }

    async fn save_resource(&mut self, resource: &ClinicalResource) -> Result<()> {
        let connection = self.connection()?;

        match resource.local_id {
            None => {
                connection
                    .execute(
                        INSERT_RESOURCE,
                        &[
                            &resource.external_id,
                            &resource.resource_kind,
                            &Json(&resource.payload),
                            &resource.version_id,
                            &resource.last_updated,
                            &resource.sync_date,
                        ],
                    )
                    .await
                    .map_err(|e| db_error("Resource insert failed", e))?;
            }
            Some(local_id) => {
                let updated = connection
                    .execute(
                        UPDATE_RESOURCE,
                        &[
                            &local_id,
                            &Json(&resource.payload),
                            &resource.last_updated,
                            &resource.sync_date,
                        ],
                    )
                    .await
                    .map_err(|e| db_error("Resource update failed", e))?;

                if updated == 0 {
                    return Err(SyncError::Persistence(format!(
                        "Resource {} (id {local_id}) no longer exists",
                        resource.external_id
                    )));
                }
            }
        }
        Ok(())
    }

    async fn save_envelope(&mut self, envelope: &SyncEnvelope) -> Result<()> {
        let row = PostgreSQLEnvelope::from_domain(envelope)?;

        self.connection()?
            .execute(
                INSERT_ENVELOPE,
                &[
                    &row.bundle_type,
                    &row.patient_id,
                    &row.bundle_data,
                    &row.total_resources,
                    &row.query_params,
                    &row.created_at,
                ],
            )
            .await
            .map_err(|e| db_error("Envelope insert failed", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}
