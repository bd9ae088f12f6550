//! Patient sync orchestration
//!
//! - [`coordinator`] - single and bulk patient sync, store statistics
//! - [`summary`] - bulk sync reporting

pub mod coordinator;
pub mod summary;

pub use coordinator::SyncCoordinator;
pub use summary::{PatientFailure, RunStatus, SyncRunSummary};
