//! Resource upsert
//!
//! Records are keyed by the resource's logical id alone. Two resources of
//! different types that share an id therefore map to the same record; the
//! second one refreshes the first one's payload and keeps its type.

use crate::adapters::database::UnitOfWork;
use crate::domain::{ClinicalResource, Result, SyncError};
use crate::fhir::{to_document, Resource};
use chrono::Utc;
use tracing::Span;

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

pub struct ResourceUpserter {
    span: Span,
}

impl ResourceUpserter {
    pub fn new() -> Self {
        Self { span: Span::none() }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Insert `resource`, or refresh the record that already carries its id
    ///
    /// On refresh the payload, `last_updated` and `sync_date` change; kind and
    /// version token stay as first stored. Exactly one write is issued.
    ///
    /// # Errors
    ///
    /// `SyncError::Serialization` if the resource has no id or cannot be
    /// turned into a document; store errors as returned by the unit of work.
    pub async fn upsert_resource(
        &self,
        uow: &mut UnitOfWork,
        resource: &Resource,
    ) -> Result<UpsertOutcome> {
        let kind = resource.resource_type();
        let external_id = resource.id().ok_or_else(|| {
            SyncError::Serialization(format!("{kind} resource has no id"))
        })?;
        let payload = to_document(resource)?;
        let now = Utc::now();

        match uow.find_resource_by_external_id(external_id).await? {
            Some(mut existing) => {
                existing.payload = payload;
                existing.last_updated = now;
                existing.sync_date = now;
                uow.save_resource(&existing).await?;

                tracing::trace!(parent: &self.span, kind, id = external_id, "Resource updated");
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let record = ClinicalResource::builder()
                    .external_id(external_id)
                    .resource_kind(kind)
                    .payload(payload)
                    .version_id(resource.version_id().map(str::to_string))
                    .last_updated(resource.last_updated().unwrap_or(now))
                    .sync_date(now)
                    .build()
                    .map_err(SyncError::Validation)?;
                uow.save_resource(&record).await?;

                tracing::trace!(parent: &self.span, kind, id = external_id, "Resource inserted");
                Ok(UpsertOutcome::Inserted)
            }
        }
    }
}

impl Default for ResourceUpserter {
    fn default() -> Self {
        Self::new()
    }
}
