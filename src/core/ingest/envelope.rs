//! Bundle persistence
//!
//! Stores a bundle as a single envelope owned by the patient named in its
//! query descriptor. Contained resources are left alone; callers that want
//! them stored run the upserter over the bundle separately.

use crate::adapters::database::UnitOfWork;
use crate::domain::{EnvelopeKind, PatientId, QueryDescriptor, Result, SyncEnvelope, SyncError};
use crate::fhir::{to_document, Bundle};
use tracing::Span;

pub struct EnvelopePersister {
    span: Span,
}

impl EnvelopePersister {
    pub fn new() -> Self {
        Self { span: Span::none() }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Save `bundle` as one envelope of the given kind
    ///
    /// # Errors
    ///
    /// `SyncError::MissingIdentifier` when `descriptor` has no non-empty
    /// `patientId`; nothing is written in that case. `SyncError::Serialization`
    /// when the bundle cannot be turned into a document.
    pub async fn persist_bundle(
        &self,
        uow: &mut UnitOfWork,
        bundle: &Bundle,
        kind: EnvelopeKind,
        descriptor: &QueryDescriptor,
    ) -> Result<SyncEnvelope> {
        let patient_id = descriptor
            .patient_id()
            .ok_or_else(|| {
                SyncError::MissingIdentifier(format!(
                    "no {} in query descriptor '{descriptor}'",
                    QueryDescriptor::PATIENT_KEY
                ))
            })
            .and_then(|raw| PatientId::new(raw).map_err(SyncError::MissingIdentifier))?;

        let payload = to_document(bundle)?;
        let envelope = SyncEnvelope::new(
            kind,
            patient_id,
            payload,
            bundle.entry_count(),
            descriptor,
        );
        uow.save_envelope(&envelope).await?;

        tracing::debug!(
            parent: &self.span,
            patient_id = %envelope.patient_id,
            kind = envelope.envelope_kind.as_str(),
            entries = envelope.resource_count,
            "Envelope stored"
        );
        Ok(envelope)
    }
}

impl Default for EnvelopePersister {
    fn default() -> Self {
        Self::new()
    }
}
