//! Clinical resource domain model
//!
//! A `ClinicalResource` is the locally stored copy of one FHIR resource,
//! keyed by the identifier the remote server assigned to it.

use crate::fhir::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locally persisted FHIR resource
///
/// At most one record exists per `external_id`. Records are created on first
/// sync, refreshed in place on later syncs and never deleted.
///
/// # Examples
///
/// ```
/// use fhirsync::domain::resource::ClinicalResource;
/// use fhirsync::fhir::Document;
/// use chrono::Utc;
///
/// let resource = ClinicalResource::builder()
///     .external_id("obs-1")
///     .resource_kind("Observation")
///     .payload(Document::new())
///     .last_updated(Utc::now())
///     .build()
///     .unwrap();
/// assert!(resource.local_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalResource {
    /// Store-assigned key, `None` until the first insert commits
    pub local_id: Option<i64>,

    /// FHIR logical id on the remote server
    pub external_id: String,

    /// FHIR `resourceType`
    pub resource_kind: String,

    /// Full resource document
    pub payload: Document,

    /// `meta.versionId` captured at insert time
    pub version_id: Option<String>,

    /// `meta.lastUpdated`, or the ingestion time when the source had none
    pub last_updated: DateTime<Utc>,

    /// When this record was last written by a sync
    pub sync_date: DateTime<Utc>,
}

impl ClinicalResource {
    /// Creates a new builder for constructing a ClinicalResource
    pub fn builder() -> ClinicalResourceBuilder {
        ClinicalResourceBuilder::default()
    }

    /// Whether the record has been stored before
    pub fn is_persisted(&self) -> bool {
        self.local_id.is_some()
    }
}

/// Builder for constructing ClinicalResource instances
#[derive(Debug, Default)]
pub struct ClinicalResourceBuilder {
    external_id: Option<String>,
    resource_kind: Option<String>,
    payload: Option<Document>,
    version_id: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    sync_date: Option<DateTime<Utc>>,
}

impl ClinicalResourceBuilder {
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn resource_kind(mut self, resource_kind: impl Into<String>) -> Self {
        self.resource_kind = Some(resource_kind.into());
        self
    }

    pub fn payload(mut self, payload: Document) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn version_id(mut self, version_id: Option<String>) -> Self {
        self.version_id = version_id;
        self
    }

    pub fn last_updated(mut self, last_updated: DateTime<Utc>) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    /// Sets the sync date; defaults to `last_updated` when omitted
    pub fn sync_date(mut self, sync_date: DateTime<Utc>) -> Self {
        self.sync_date = Some(sync_date);
        self
    }

    /// Builds the ClinicalResource
    ///
    /// # Errors
    ///
    /// Returns an error if any required field is missing or the external id is blank
    pub fn build(self) -> Result<ClinicalResource, String> {
        let external_id = self.external_id.ok_or("external_id is required")?;
        if external_id.trim().is_empty() {
            return Err("external_id cannot be empty".to_string());
        }
        let last_updated = self.last_updated.ok_or("last_updated is required")?;

        Ok(ClinicalResource {
            local_id: None,
            external_id,
            resource_kind: self.resource_kind.ok_or("resource_kind is required")?,
            payload: self.payload.ok_or("payload is required")?,
            version_id: self.version_id,
            last_updated,
            sync_date: self.sync_date.unwrap_or(last_updated),
        })
    }
}
