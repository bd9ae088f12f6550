//! Remote FHIR server integration
//!
//! The [`FhirSource`] trait is the seam the sync orchestrators fetch through;
//! [`FhirSourceClient`] implements it over HTTP for any FHIR R4 server that
//! supports `Patient/$everything`.

pub mod client;
mod r#trait;

pub use client::FhirSourceClient;
pub use r#trait::FhirSource;
