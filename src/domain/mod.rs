//! Domain models and types for FhirSync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PatientId`], [`TransactionId`])
//! - **Stored records** ([`ClinicalResource`], [`SyncEnvelope`])
//! - **Error types** ([`SyncError`], [`SourceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! ```rust
//! use fhirsync::domain::{PatientId, QueryDescriptor};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let patient_id = PatientId::new("592912")?;
//! let descriptor = QueryDescriptor::for_patient(&patient_id);
//! assert_eq!(descriptor.patient_id(), Some("592912"));
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use envelope::{EnvelopeKind, QueryDescriptor, SyncEnvelope};
pub use errors::{SourceError, SyncError};
pub use ids::{PatientId, TransactionId};
pub use resource::{ClinicalResource, ClinicalResourceBuilder};
pub use result::Result;
