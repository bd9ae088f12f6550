//! Domain error types
//!
//! This module defines the error hierarchy for FhirSync. Every failure that
//! crosses a component boundary is a [`SyncError`]; third-party error types
//! are converted at the adapter edge and never leak through the public API.

use thiserror::Error;

/// Main FhirSync error type
///
/// Each variant is a stable error kind. Orchestrators match on the kind to
/// decide whether a failure aborts the whole operation or is isolated to a
/// single patient or file.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote FHIR source errors
    #[error("FHIR source error: {0}")]
    Source(#[from] SourceError),

    /// A resource or bundle could not be converted to or from a document
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store rejected a read or write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A required identifier could not be resolved
    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    /// The generator tooling directory does not exist
    #[error("Generator tooling not found: {0}")]
    MissingTooling(String),

    /// The generator artifact was not found in any known location
    #[error("Generator executable not found: {0}")]
    MissingExecutable(String),

    /// The generator process failed to start or exited unsuccessfully
    #[error("Generator process failed{}: {message}", exit_suffix(.exit_code))]
    GeneratorProcess {
        exit_code: Option<i32>,
        message: String,
    },

    /// A single generated file could not be ingested
    #[error("Failed to process file {path}: {reason}")]
    FileProcessing { path: String, reason: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl SyncError {
    /// Whether the remote source could not be reached at all
    ///
    /// The CLI maps these to the connection exit code.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            SyncError::Source(SourceError::ConnectionFailed(_))
                | SyncError::Source(SourceError::Timeout(_))
        )
    }
}

/// Remote FHIR source errors
///
/// Errors that occur when talking to the FHIR server. These never expose the
/// HTTP client's own error types.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the FHIR server
    #[error("Failed to connect to FHIR server: {0}")]
    ConnectionFailed(String),

    /// Response body was not a usable FHIR document
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Requested resource does not exist on the server
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Invalid URL or request format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl SourceError {
    /// Whether a retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::ConnectionFailed(_)
                | SourceError::Timeout(_)
                | SourceError::ServerError { .. }
        )
    }
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_source_error_conversion() {
        let source_err = SourceError::ConnectionFailed("Network error".to_string());
        let err: SyncError = source_err.into();
        assert!(matches!(err, SyncError::Source(_)));
        assert!(err.is_connection());
    }

    #[test]
    fn test_generator_process_display_with_code() {
        let err = SyncError::GeneratorProcess {
            exit_code: Some(3),
            message: "synthea failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Generator process failed with exit code 3: synthea failed"
        );
    }

    #[test]
    fn test_generator_process_display_without_code() {
        let err = SyncError::GeneratorProcess {
            exit_code: None,
            message: "terminated by signal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Generator process failed: terminated by signal"
        );
    }

    #[test]
    fn test_retryable_source_errors() {
        assert!(SourceError::Timeout("slow".to_string()).is_retryable());
        assert!(SourceError::ServerError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!SourceError::ClientError {
            status: 404,
            message: "gone".to_string()
        }
        .is_retryable());
        assert!(!SourceError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SyncError = json_err.into();
        assert!(matches!(err, SyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_sync_error_implements_std_error() {
        let err = SyncError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
