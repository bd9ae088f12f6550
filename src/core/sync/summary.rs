//! Bulk sync summary and reporting

use crate::core::batch::BatchOutcome;
use crate::domain::PatientId;
use serde::Serialize;
use std::time::Duration;
use tracing::Span;

/// Terminal status of a run that got past its fatal steps
///
/// Per-item failures never change it; they are reported alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
}

/// One patient that could not be synced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFailure {
    pub patient_id: String,
    pub message: String,
}

/// Summary of a bulk sync
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunSummary {
    pub status: RunStatus,

    /// Patients asked for
    pub requested: usize,

    /// Patients synced
    pub synced: usize,

    /// Patients that failed
    pub failed: usize,

    /// Resources processed across successful patients only
    pub total_resources: usize,

    /// Ids of synced patients in directory order
    pub synced_patient_ids: Vec<String>,

    /// Ids of failed patients in directory order; `unknown` for entries without id
    pub failed_patient_ids: Vec<String>,

    pub failures: Vec<PatientFailure>,

    pub duration_ms: u64,
}

impl SyncRunSummary {
    /// Build the summary from a finished batch keyed by patient
    pub fn from_outcome(
        requested: usize,
        outcome: &BatchOutcome<PatientId, usize>,
        duration: Duration,
    ) -> Self {
        Self {
            status: RunStatus::Success,
            requested,
            synced: outcome.succeeded.len(),
            failed: outcome.failed.len(),
            total_resources: outcome.aggregate(0, |total, count| total + count),
            synced_patient_ids: outcome.succeeded_keys().map(|id| id.to_string()).collect(),
            failed_patient_ids: outcome.failed_keys().map(|id| id.to_string()).collect(),
            failures: outcome
                .failed
                .iter()
                .map(|failure| PatientFailure {
                    patient_id: failure.key.to_string(),
                    message: failure.error.to_string(),
                })
                .collect(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Check if every patient was synced
    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }

    /// Log the summary
    pub fn log_summary(&self, span: &Span) {
        tracing::info!(
            parent: span,
            requested = self.requested,
            synced = self.synced,
            failed = self.failed,
            total_resources = self.total_resources,
            duration_ms = self.duration_ms,
            "Bulk sync completed"
        );

        for failure in &self.failures {
            tracing::warn!(
                parent: span,
                patient_id = %failure.patient_id,
                message = %failure.message,
                "Patient sync failed"
            );
        }
    }
}
