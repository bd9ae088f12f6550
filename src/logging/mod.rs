//! Logging and observability
//!
//! Structured logging on top of `tracing`:
//! - console output with span timings
//! - optional JSON file output with rotation
//!
//! Components never reach for a global logger of their own. Each one is
//! handed a `tracing::Span` when it is built and emits its events with that
//! span as explicit parent, so a caller decides where a component's output is
//! grouped.
//!
//! # Example
//!
//! ```no_run
//! use fhirsync::logging::init_logging;
//! use fhirsync::config::LoggingConfig;
//!
//! let _guard = init_logging("info", &LoggingConfig::default()).expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a patient sync under the given span
///
/// # Example
///
/// ```no_run
/// use fhirsync::log_sync_start;
/// use fhirsync::domain::PatientId;
///
/// let span = tracing::info_span!("sync");
/// let patient_id = PatientId::new("592912").unwrap();
/// log_sync_start!(&span, &patient_id);
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($span:expr, $patient_id:expr) => {
        tracing::info!(
            parent: $span,
            patient_id = %$patient_id,
            "Starting patient sync"
        );
    };
}

/// Log the completion of a patient sync under the given span
///
/// # Example
///
/// ```no_run
/// use fhirsync::log_sync_complete;
/// use std::time::Duration;
///
/// let span = tracing::info_span!("sync");
/// log_sync_complete!(&span, "592912", 42, Duration::from_millis(350));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($span:expr, $patient_id:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            parent: $span,
            patient_id = %$patient_id,
            resources = $count,
            duration_ms = $duration.as_millis() as u64,
            "Patient sync completed"
        );
    };
}
