//! Scoped store session
//!
//! A [`UnitOfWork`] wraps one [`StoreSession`] and guarantees it is released
//! on every exit path: [`finish`](UnitOfWork::finish) commits an `Ok` outcome
//! and rolls back an `Err` one, and dropping an unfinished unit (panic, early
//! return, cancelled future) discards its writes through the session's own
//! drop.

use super::traits::{ResourceStore, StoreSession};
use crate::domain::{ClinicalResource, Result, SyncEnvelope, SyncError};
use tracing::Span;

pub struct UnitOfWork {
    session: Option<Box<dyn StoreSession>>,
    label: String,
    writes: usize,
    span: Span,
}

impl UnitOfWork {
    /// Opens a session on `store`
    ///
    /// `label` names the unit in logs, e.g. `patient:592912`.
    pub async fn begin(
        store: &dyn ResourceStore,
        label: impl Into<String>,
        span: &Span,
    ) -> Result<Self> {
        let label = label.into();
        let session = store.begin().await?;
        tracing::trace!(parent: span, unit = %label, backend = store.backend_name(), "Unit of work opened");

        Ok(Self {
            session: Some(session),
            label,
            writes: 0,
            span: span.clone(),
        })
    }

    pub async fn find_resource_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<ClinicalResource>> {
        self.session()?
            .find_resource_by_external_id(external_id)
            .await
    }

    pub async fn save_resource(&mut self, resource: &ClinicalResource) -> Result<()> {
        self.session()?.save_resource(resource).await?;
        self.writes += 1;
        Ok(())
    }

    pub async fn save_envelope(&mut self, envelope: &SyncEnvelope) -> Result<()> {
        self.session()?.save_envelope(envelope).await?;
        self.writes += 1;
        Ok(())
    }

    /// Writes issued through this unit so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Commits and returns the number of writes made durable
    pub async fn commit(mut self) -> Result<usize> {
        let session = self.take_session()?;
        session.commit().await?;
        tracing::debug!(parent: &self.span, unit = %self.label, writes = self.writes, "Unit of work committed");
        Ok(self.writes)
    }

    /// Discards every write made through this unit
    pub async fn rollback(mut self) -> Result<()> {
        let session = self.take_session()?;
        session.rollback().await?;
        tracing::debug!(parent: &self.span, unit = %self.label, writes = self.writes, "Unit of work rolled back");
        Ok(())
    }

    /// Commits on `Ok`, rolls back on `Err`
    ///
    /// A failed rollback is logged and the original error is returned; a
    /// failed commit is returned as is.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let span = self.span.clone();
                let label = self.label.clone();
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(
                        parent: &span,
                        unit = %label,
                        error = %rollback_err,
                        "Rollback failed; uncommitted writes are discarded with the session"
                    );
                }
                Err(err)
            }
        }
    }

    fn session(&mut self) -> Result<&mut Box<dyn StoreSession>> {
        self.session.as_mut().ok_or_else(|| finished(&self.label))
    }

    fn take_session(&mut self) -> Result<Box<dyn StoreSession>> {
        self.session.take().ok_or_else(|| finished(&self.label))
    }
}

fn finished(label: &str) -> SyncError {
    SyncError::Persistence(format!("unit of work '{label}' is already finished"))
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::warn!(
                parent: &self.span,
                unit = %self.label,
                writes = self.writes,
                "Unit of work dropped before commit; discarding writes"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::fhir::Document;
    use chrono::Utc;

    fn resource(external_id: &str) -> ClinicalResource {
        ClinicalResource::builder()
            .external_id(external_id)
            .resource_kind("Patient")
            .payload(Document::new())
            .last_updated(Utc::now())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_returns_write_count() {
        let store = InMemoryStore::new();
        let mut uow = UnitOfWork::begin(&store, "test", &Span::none()).await.unwrap();
        uow.save_resource(&resource("a")).await.unwrap();
        uow.save_resource(&resource("b")).await.unwrap();
        assert_eq!(uow.writes(), 2);

        assert_eq!(uow.commit().await.unwrap(), 2);
        assert_eq!(store.resources().len(), 2);
    }

    #[tokio::test]
    async fn test_finish_err_rolls_back() {
        let store = InMemoryStore::new();
        let mut uow = UnitOfWork::begin(&store, "test", &Span::none()).await.unwrap();
        uow.save_resource(&resource("a")).await.unwrap();

        let outcome: Result<()> = Err(SyncError::Validation("boom".to_string()));
        let err = uow.finish(outcome).await.unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        assert!(store.resources().is_empty());
    }

    #[tokio::test]
    async fn test_finish_ok_commits() {
        let store = InMemoryStore::new();
        let mut uow = UnitOfWork::begin(&store, "test", &Span::none()).await.unwrap();
        uow.save_resource(&resource("a")).await.unwrap();

        let value = uow.finish(Ok(7)).await.unwrap();
        assert_eq!(value, 7);
        assert!(store.resource("a").is_some());
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = InMemoryStore::new();
        {
            let mut uow = UnitOfWork::begin(&store, "test", &Span::none()).await.unwrap();
            uow.save_resource(&resource("a")).await.unwrap();
        }
        assert!(store.resources().is_empty());
    }

    #[tokio::test]
    async fn test_reads_see_own_writes() {
        let store = InMemoryStore::new();
        let mut uow = UnitOfWork::begin(&store, "test", &Span::none()).await.unwrap();
        uow.save_resource(&resource("a")).await.unwrap();

        let found = uow.find_resource_by_external_id("a").await.unwrap();
        assert!(found.is_some());
        uow.rollback().await.unwrap();
    }
}
