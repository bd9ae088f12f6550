//! PostgreSQL row models
//!
//! This module maps the `fhir_resources` and `fhir_bundles` tables to the
//! domain types.

use crate::adapters::postgresql::client::db_error;
use crate::domain::{ClinicalResource, Result, SyncEnvelope, SyncError};
use crate::fhir::Document;
use chrono::{DateTime, Utc};
use tokio_postgres::types::Json;
use tokio_postgres::Row;

/// Row of the `fhir_resources` table
#[derive(Debug, Clone)]
pub struct PostgreSQLResource {
    pub id: i64,
    pub fhir_id: String,
    pub resource_type: String,
    pub resource_data: Document,
    pub version_id: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub sync_date: DateTime<Utc>,
}

impl PostgreSQLResource {
    /// Columns selected by every resource query, in `from_row` order
    pub const COLUMNS: &'static str =
        "id, fhir_id, resource_type, resource_data, version_id, last_updated, sync_date";

    /// Read a row selected with [`Self::COLUMNS`]
    pub fn from_row(row: &Row) -> Result<Self> {
        let Json(resource_data): Json<Document> = row
            .try_get("resource_data")
            .map_err(|e| db_error("Invalid resource_data column", e))?;

        Ok(Self {
            id: row.try_get("id").map_err(|e| db_error("Invalid id column", e))?,
            fhir_id: row
                .try_get("fhir_id")
                .map_err(|e| db_error("Invalid fhir_id column", e))?,
            resource_type: row
                .try_get("resource_type")
                .map_err(|e| db_error("Invalid resource_type column", e))?,
            resource_data,
            version_id: row
                .try_get("version_id")
                .map_err(|e| db_error("Invalid version_id column", e))?,
            last_updated: row
                .try_get("last_updated")
                .map_err(|e| db_error("Invalid last_updated column", e))?,
            sync_date: row
                .try_get("sync_date")
                .map_err(|e| db_error("Invalid sync_date column", e))?,
        })
    }

    /// Convert to domain ClinicalResource
    pub fn into_domain(self) -> ClinicalResource {
        ClinicalResource {
            local_id: Some(self.id),
            external_id: self.fhir_id,
            resource_kind: self.resource_type,
            payload: self.resource_data,
            version_id: self.version_id,
            last_updated: self.last_updated,
            sync_date: self.sync_date,
        }
    }
}

/// Insert parameters for the `fhir_bundles` table
///
/// Borrows the envelope so the bundle document is not copied before it is
/// encoded.
#[derive(Debug)]
pub struct PostgreSQLEnvelope<'a> {
    pub bundle_type: &'a str,
    pub patient_id: &'a str,
    pub bundle_data: Json<&'a Document>,
    pub total_resources: i32,
    pub query_params: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> PostgreSQLEnvelope<'a> {
    /// Convert from domain SyncEnvelope
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Persistence` if the entry count does not fit the
    /// `total_resources` column.
    pub fn from_domain(envelope: &'a SyncEnvelope) -> Result<Self> {
        let total_resources = i32::try_from(envelope.resource_count).map_err(|_| {
            SyncError::Persistence(format!(
                "Envelope entry count {} exceeds the total_resources column",
                envelope.resource_count
            ))
        })?;

        Ok(Self {
            bundle_type: envelope.envelope_kind.as_str(),
            patient_id: envelope.patient_id.as_str(),
            bundle_data: Json(&envelope.payload),
            total_resources,
            query_params: &envelope.query_descriptor,
            created_at: envelope.created_at,
        })
    }
}
