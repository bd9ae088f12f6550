//! Sync envelope domain model
//!
//! An envelope is the whole bundle exactly as it was fetched or generated,
//! stored once per fetch together with its provenance.

use super::ids::PatientId;
use crate::fhir::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an envelope came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EnvelopeKind {
    /// `Patient/{id}/$everything` from the remote server
    PatientEverything,
    /// A file produced by the Synthea generator
    SyntheaGenerated,
    /// Any other provenance tag
    Other(String),
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &str {
        match self {
            EnvelopeKind::PatientEverything => "patient-everything",
            EnvelopeKind::SyntheaGenerated => "synthea-generated",
            EnvelopeKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EnvelopeKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "patient-everything" => EnvelopeKind::PatientEverything,
            "synthea-generated" => EnvelopeKind::SyntheaGenerated,
            _ => EnvelopeKind::Other(tag),
        }
    }
}

impl From<EnvelopeKind> for String {
    fn from(kind: EnvelopeKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Provenance string of the form `key=value&key=value`
///
/// The owning patient of an envelope is always carried in the `patientId` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor(String);

impl QueryDescriptor {
    pub const PATIENT_KEY: &'static str = "patientId";

    /// Wraps an arbitrary descriptor string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Descriptor naming a single patient
    pub fn for_patient(patient_id: &PatientId) -> Self {
        Self(format!("{}={}", Self::PATIENT_KEY, patient_id))
    }

    /// Value of the `patientId` key, if present and non-empty
    ///
    /// Pairs are split on `&`, so the value ends at the next `&`.
    pub fn patient_id(&self) -> Option<&str> {
        self.0
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == Self::PATIENT_KEY)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored copy of a fetched or generated bundle
///
/// Envelopes are immutable: there is no update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    /// Store-assigned key, `None` until the insert commits
    pub local_id: Option<i64>,

    pub envelope_kind: EnvelopeKind,

    /// Owning patient, resolved from the query descriptor
    pub patient_id: PatientId,

    /// Full bundle document
    pub payload: Document,

    /// Number of entries in the bundle
    pub resource_count: usize,

    /// Descriptor the envelope was fetched or generated with
    pub query_descriptor: String,

    pub created_at: DateTime<Utc>,
}

impl SyncEnvelope {
    pub fn new(
        envelope_kind: EnvelopeKind,
        patient_id: PatientId,
        payload: Document,
        resource_count: usize,
        query_descriptor: &QueryDescriptor,
    ) -> Self {
        Self {
            local_id: None,
            envelope_kind,
            patient_id,
            payload,
            resource_count,
            query_descriptor: query_descriptor.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("patientId=123", Some("123") ; "single pair")]
    #[test_case("patientId=X&other=Y", Some("X") ; "value ends at ampersand")]
    #[test_case("source=remote&patientId=abc", Some("abc") ; "key not first")]
    #[test_case("patientId=", None ; "empty value")]
    #[test_case("other=1", None ; "key absent")]
    #[test_case("", None ; "empty descriptor")]
    #[test_case("patientIdentifier=9", None ; "key prefix does not match")]
    #[test_case("patientId=a=b", Some("a=b") ; "value keeps later equals signs")]
    fn test_patient_id_from_descriptor(raw: &str, expected: Option<&str>) {
        assert_eq!(QueryDescriptor::new(raw).patient_id(), expected);
    }

    #[test]
    fn test_for_patient_round_trips() {
        let id = PatientId::new("592912").unwrap();
        let descriptor = QueryDescriptor::for_patient(&id);
        assert_eq!(descriptor.as_str(), "patientId=592912");
        assert_eq!(descriptor.patient_id(), Some("592912"));
    }

    #[test]
    fn test_envelope_kind_tags() {
        assert_eq!(EnvelopeKind::PatientEverything.as_str(), "patient-everything");
        assert_eq!(EnvelopeKind::SyntheaGenerated.to_string(), "synthea-generated");
        assert_eq!(
            EnvelopeKind::from("manual-import".to_string()),
            EnvelopeKind::Other("manual-import".to_string())
        );
        assert_eq!(
            EnvelopeKind::from("synthea-generated".to_string()),
            EnvelopeKind::SyntheaGenerated
        );
    }
}
