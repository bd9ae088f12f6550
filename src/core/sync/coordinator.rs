//! Sync coordinator - orchestrates patient syncs from the remote FHIR server
//!
//! A single patient sync fetches the patient's full record set, then stores
//! the envelope and every contained resource inside one unit of work. Bulk
//! sync runs single syncs for the patients in the server's directory and
//! isolates their failures from each other.

use crate::adapters::database::{create_store, ResourceStore, UnitOfWork};
use crate::adapters::source::{FhirSource, FhirSourceClient};
use crate::config::FhirSyncConfig;
use crate::core::batch::BatchRunner;
use crate::core::ingest::{EnvelopePersister, ResourceUpserter};
use crate::core::sync::summary::SyncRunSummary;
use crate::domain::{EnvelopeKind, PatientId, QueryDescriptor, Result, SyncError};
use crate::fhir::Bundle;
use crate::{log_sync_complete, log_sync_start};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Span;

/// Sync coordinator
pub struct SyncCoordinator {
    source: Arc<dyn FhirSource>,
    store: Arc<dyn ResourceStore>,
    upserter: ResourceUpserter,
    persister: EnvelopePersister,
    span: Span,
}

impl SyncCoordinator {
    pub fn new(source: Arc<dyn FhirSource>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            source,
            store,
            upserter: ResourceUpserter::new(),
            persister: EnvelopePersister::new(),
            span: Span::none(),
        }
    }

    /// Emit this coordinator's events, and those of its units, under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.upserter = ResourceUpserter::new().with_span(span.clone());
        self.persister = EnvelopePersister::new().with_span(span.clone());
        self.span = span;
        self
    }

    /// Create a coordinator with the HTTP source and the configured store
    pub async fn from_config(config: &FhirSyncConfig) -> Result<Self> {
        let span = tracing::info_span!("sync", source = %config.source.base_url);
        let source = FhirSourceClient::new(config.source.clone())?.with_span(span.clone());
        let store = create_store(config).await?;

        Ok(Self::new(Arc::new(source), store).with_span(span))
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Sync one patient's complete record set
    ///
    /// Returns the number of resources processed. Either the envelope and all
    /// resources are stored, or nothing is.
    pub async fn sync_patient(&self, patient_id: &PatientId) -> Result<usize> {
        let started = Instant::now();
        log_sync_start!(&self.span, patient_id);

        let bundle = self.source.fetch_patient_record_set(patient_id).await?;

        let mut uow = UnitOfWork::begin(
            self.store.as_ref(),
            format!("patient:{patient_id}"),
            &self.span,
        )
        .await?;
        let outcome = self.store_record_set(&mut uow, patient_id, &bundle).await;
        let processed = uow.finish(outcome).await?;

        log_sync_complete!(&self.span, patient_id, processed, started.elapsed());
        Ok(processed)
    }

    async fn store_record_set(
        &self,
        uow: &mut UnitOfWork,
        patient_id: &PatientId,
        bundle: &Bundle,
    ) -> Result<usize> {
        self.persister
            .persist_bundle(
                uow,
                bundle,
                EnvelopeKind::PatientEverything,
                &QueryDescriptor::for_patient(patient_id),
            )
            .await?;

        let mut processed = 0;
        for resource in bundle.resources() {
            self.upserter.upsert_resource(uow, resource).await?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Sync up to `count` patients from the server's patient directory
    ///
    /// Only a failing directory fetch aborts the run; each patient's failure is
    /// recorded in the summary.
    pub async fn sync_multiple_patients(&self, count: usize) -> Result<SyncRunSummary> {
        if count == 0 {
            return Err(SyncError::Validation(
                "patient count must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        tracing::info!(parent: &self.span, count, "Starting bulk sync");

        let directory = self.source.fetch_patient_directory(count).await?;
        let patients: Vec<(PatientId, Option<PatientId>)> = directory
            .resources()
            .filter(|resource| resource.is_patient())
            .take(count)
            .map(|resource| match resource.id().map(PatientId::new) {
                Some(Ok(id)) => (id.clone(), Some(id)),
                _ => (PatientId::unknown(), None),
            })
            .collect();

        tracing::info!(parent: &self.span, found = patients.len(), "Patients found");

        let runner = BatchRunner::new("bulk-sync").with_span(self.span.clone());
        let outcome = runner
            .run(patients, |patient| async move {
                match patient {
                    Some(id) => self.sync_patient(&id).await,
                    None => Err(SyncError::MissingIdentifier(
                        "patient entry has no id".to_string(),
                    )),
                }
            })
            .await;

        let summary = SyncRunSummary::from_outcome(count, &outcome, started.elapsed());
        summary.log_summary(&self.span);
        Ok(summary)
    }

    /// Stored resource count per `resourceType`
    pub async fn get_sync_statistics(&self) -> Result<BTreeMap<String, i64>> {
        self.store.count_resources_by_kind().await
    }

    /// Number of stored envelopes
    pub async fn get_envelope_count(&self) -> Result<i64> {
        self.store.count_envelopes().await
    }
}
