//! FHIR R4 bundle and resource models
//!
//! Only the parts of a bundle that the sync engine reads are typed. Every
//! other field is kept in an ordered `extra` map so a stored envelope carries
//! the whole document as received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Generic ordered document
///
/// `serde_json` is built with `preserve_order`, so keys keep their source order.
pub type Document = serde_json::Map<String, Value>;

/// A single FHIR resource
///
/// Held as its raw document. Deserialization only insists on a string
/// `resourceType`; everything else is read through the accessors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Document")]
pub struct Resource(Document);

impl Resource {
    /// Wraps a document, requiring a `resourceType`
    pub fn from_document(document: Document) -> Result<Self, String> {
        match document.get("resourceType") {
            Some(Value::String(kind)) if !kind.is_empty() => Ok(Self(document)),
            Some(_) => Err("resourceType must be a non-empty string".to_string()),
            None => Err("resource has no resourceType".to_string()),
        }
    }

    /// The FHIR `resourceType`
    pub fn resource_type(&self) -> &str {
        self.0
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The logical id, when present and non-blank
    pub fn id(&self) -> Option<&str> {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    /// `meta.versionId`
    pub fn version_id(&self) -> Option<&str> {
        self.meta().and_then(|meta| meta.get("versionId")?.as_str())
    }

    /// `meta.lastUpdated`, if present and a valid instant
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = self.meta()?.get("lastUpdated")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Whether this is a `Patient` resource
    pub fn is_patient(&self) -> bool {
        self.resource_type() == "Patient"
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }

    fn meta(&self) -> Option<&Document> {
        self.0.get("meta").and_then(Value::as_object)
    }
}

impl TryFrom<Document> for Resource {
    type Error = String;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        Self::from_document(document)
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// A `Bundle.link` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// A `Bundle.entry` element
///
/// An entry without a resource is rejected at parse time; the sync engine has
/// nothing to store for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    pub resource: Resource,

    #[serde(flatten)]
    pub extra: Document,
}

impl BundleEntry {
    pub fn new(resource: Resource) -> Self {
        Self {
            full_url: None,
            resource,
            extra: Document::new(),
        }
    }
}

/// A FHIR `Bundle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    #[serde(flatten)]
    pub extra: Document,
}

impl Bundle {
    /// Creates an empty bundle of the given `type`
    pub fn new(bundle_type: impl Into<String>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type: Some(bundle_type.into()),
            total: None,
            link: Vec::new(),
            entry: Vec::new(),
            extra: Document::new(),
        }
    }

    /// Appends a resource as a new entry
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.entry.push(BundleEntry::new(resource));
        self
    }

    /// Number of entries in the bundle
    pub fn entry_count(&self) -> usize {
        self.entry.len()
    }

    /// Contained resources in entry order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().map(|entry| &entry.resource)
    }

    /// The `next` paging link, if the server returned one
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|link| link.relation == "next")
            .map(|link| link.url.as_str())
    }

    /// Moves another page's entries onto the end of this bundle
    ///
    /// Paging links are replaced by the other page's links so the caller can
    /// keep following `next`.
    pub fn absorb_page(&mut self, page: Bundle) {
        self.entry.extend(page.entry);
        self.link = page.link;
    }
}
