//! Per-job working directory
//!
//! Every generation job writes into its own `synthea_output_<uuid>` directory.
//! The directory is removed by [`GenerationJob::release`] on the normal path
//! and by `Drop` when the job is abandoned (error, panic, cancelled future).

use crate::domain::{Result, SyncError, TransactionId};
use std::path::{Path, PathBuf};
use tracing::Span;

/// Prefix of job directory names under the output root
pub const JOB_DIR_PREFIX: &str = "synthea_output_";

/// Exclusive working directory of one job
#[derive(Debug)]
pub struct JobWorkspace {
    path: PathBuf,
    released: bool,
    span: Span,
}

impl JobWorkspace {
    /// Create `<output_root>/synthea_output_<transaction_id>`
    ///
    /// The output root is created if needed; the job directory itself must
    /// not exist yet.
    pub async fn create(
        output_root: &Path,
        transaction_id: &TransactionId,
        span: &Span,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(output_root).await.map_err(|e| {
            SyncError::Io(format!(
                "cannot create output root {}: {e}",
                output_root.display()
            ))
        })?;

        let path = output_root.join(format!("{JOB_DIR_PREFIX}{transaction_id}"));
        tokio::fs::create_dir(&path).await.map_err(|e| {
            SyncError::Io(format!("cannot create job directory {}: {e}", path.display()))
        })?;

        let mut workspace = Self {
            path,
            released: false,
            span: span.clone(),
        };
        // The generator runs with the job directory as cwd, so hand it an absolute path
        workspace.path = tokio::fs::canonicalize(&workspace.path).await?;

        tracing::debug!(parent: span, dir = %workspace.path.display(), "Job directory created");
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it
    ///
    /// A failure is logged and otherwise ignored.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                tracing::debug!(parent: &self.span, dir = %self.path.display(), "Job directory removed");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    parent: &self.span,
                    dir = %self.path.display(),
                    error = %e,
                    "Failed to remove job directory"
                );
            }
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    parent: &self.span,
                    dir = %self.path.display(),
                    error = %e,
                    "Failed to remove abandoned job directory"
                );
            }
        }
    }
}

/// One generator run
#[derive(Debug)]
pub struct GenerationJob {
    pub transaction_id: TransactionId,
    pub workspace: JobWorkspace,
    pub requested: u32,
}

impl GenerationJob {
    /// Allocate a fresh transaction id and its working directory
    pub async fn create(output_root: &Path, requested: u32, span: &Span) -> Result<Self> {
        let transaction_id = TransactionId::generate();
        let workspace = JobWorkspace::create(output_root, &transaction_id, span).await?;

        Ok(Self {
            transaction_id,
            workspace,
            requested,
        })
    }

    /// Remove the working directory
    pub async fn release(self) {
        self.workspace.release().await;
    }
}
