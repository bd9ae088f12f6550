//! FHIR source trait definition

use crate::domain::ids::PatientId;
use crate::domain::Result;
use crate::fhir::Bundle;
use async_trait::async_trait;

/// Read access to a remote FHIR server
///
/// Implementations must be shareable across tasks; the orchestrators hold
/// them behind an `Arc`.
#[async_trait]
pub trait FhirSource: Send + Sync {
    /// Every resource in the patient's compartment as a single bundle
    ///
    /// Paged responses are merged so the returned bundle holds all entries in
    /// the order the server sent them.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Source` if the server cannot be reached or answers
    /// with an error, or if a page is not a valid bundle.
    async fn fetch_patient_record_set(&self, patient_id: &PatientId) -> Result<Bundle>;

    /// A searchset bundle listing up to `count` patients
    async fn fetch_patient_directory(&self, count: usize) -> Result<Bundle>;
}
