//! Document codec
//!
//! Converts resources and bundles to the generic ordered document that the
//! store persists, and parses bundle text coming from the remote server or
//! from generator output files.

use super::bundle::{Bundle, Document};
use crate::domain::{Result, SyncError};
use serde::Serialize;
use serde_json::Value;

/// Serializes a value into an ordered document
///
/// # Errors
///
/// Returns `SyncError::Serialization` if the value does not serialize to a
/// JSON object.
pub fn to_document<T>(value: &T) -> Result<Document>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::Serialization(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Parses bundle text
///
/// # Errors
///
/// Returns `SyncError::Serialization` if the text is not JSON, is not a
/// `Bundle`, or contains an entry without a resource.
pub fn parse_bundle(text: &str) -> Result<Bundle> {
    let value: Value = serde_json::from_str(text)?;
    bundle_from_value(value)
}

/// Converts an already-parsed JSON value into a bundle
pub fn bundle_from_value(value: Value) -> Result<Bundle> {
    match value.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => {}
        Some(other) => {
            return Err(SyncError::Serialization(format!(
                "expected resourceType Bundle, got {other}"
            )))
        }
        None => {
            return Err(SyncError::Serialization(
                "document has no resourceType".to_string(),
            ))
        }
    }

    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bundle() {
        let text = r#"{
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Encounter", "id": "e1"}}
            ]
        }"#;

        let bundle = parse_bundle(text).unwrap();
        assert_eq!(bundle.entry_count(), 2);
        assert_eq!(bundle.bundle_type.as_deref(), Some("collection"));
    }

    #[test]
    fn test_parse_rejects_non_bundle() {
        let err = parse_bundle(r#"{"resourceType": "Patient", "id": "p1"}"#).unwrap_err();
        assert!(matches!(err, SyncError::Serialization(_)));
        assert!(err.to_string().contains("Patient"));
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        let err = parse_bundle("{ this is not json").unwrap_err();
        assert!(matches!(err, SyncError::Serialization(_)));
    }

    #[test]
    fn test_to_document_preserves_field_order() {
        let bundle = bundle_from_value(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [{"resource": {"resourceType": "Patient", "id": "p1", "active": true, "gender": "female"}}]
        }))
        .unwrap();

        let doc = to_document(&bundle.entry[0].resource).unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["resourceType", "id", "active", "gender"]);
    }

    #[test]
    fn test_to_document_rejects_scalars() {
        let err = to_document(&42).unwrap_err();
        assert!(matches!(err, SyncError::Serialization(_)));
    }
}
