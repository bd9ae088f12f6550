//! In-memory store
//!
//! Keeps resources and envelopes in process memory. Sessions stage their
//! writes and apply them in one step on commit, so the all-or-nothing
//! contract of [`StoreSession`] holds exactly as it does for PostgreSQL.

use crate::adapters::database::traits::{ResourceStore, StoreSession};
use crate::domain::{ClinicalResource, Result, SyncEnvelope};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    resources: Vec<ClinicalResource>,
    envelopes: Vec<SyncEnvelope>,
    next_resource_id: i64,
    next_envelope_id: i64,
}

impl MemoryState {
    fn apply_resource(&mut self, mut resource: ClinicalResource) {
        let existing = match resource.local_id {
            Some(local_id) => self
                .resources
                .iter()
                .position(|r| r.local_id == Some(local_id)),
            None => self
                .resources
                .iter()
                .position(|r| r.external_id == resource.external_id),
        };

        match existing {
            Some(index) => {
                let stored = &mut self.resources[index];
                stored.payload = resource.payload;
                stored.last_updated = resource.last_updated;
                stored.sync_date = resource.sync_date;
            }
            None => {
                self.next_resource_id += 1;
                resource.local_id = Some(self.next_resource_id);
                self.resources.push(resource);
            }
        }
    }

    fn apply_envelope(&mut self, mut envelope: SyncEnvelope) {
        self.next_envelope_id += 1;
        envelope.local_id = Some(self.next_envelope_id);
        self.envelopes.push(envelope);
    }
}

/// Process-local [`ResourceStore`]
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of committed resources in insertion order
    pub fn resources(&self) -> Vec<ClinicalResource> {
        self.lock().resources.clone()
    }

    /// Snapshot of committed envelopes in insertion order
    pub fn envelopes(&self) -> Vec<SyncEnvelope> {
        self.lock().envelopes.clone()
    }

    /// Committed resource with the given FHIR id
    pub fn resource(&self, external_id: &str) -> Option<ClinicalResource> {
        self.lock()
            .resources
            .iter()
            .find(|r| r.external_id == external_id)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

// A panic while holding the lock cannot leave half-applied writes behind
// (commit applies after all staging is done), so a poisoned lock is still usable.
fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            staged_resources: Vec::new(),
            staged_envelopes: Vec::new(),
        }))
    }

    async fn count_resources_by_kind(&self) -> Result<BTreeMap<String, i64>> {
        let state = self.lock();
        let mut counts = BTreeMap::new();
        for resource in &state.resources {
            *counts.entry(resource.resource_kind.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_envelopes(&self) -> Result<i64> {
        Ok(self.lock().envelopes.len() as i64)
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
    staged_resources: Vec<ClinicalResource>,
    staged_envelopes: Vec<SyncEnvelope>,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn find_resource_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<ClinicalResource>> {
        if let Some(staged) = self
            .staged_resources
            .iter()
            .find(|r| r.external_id == external_id)
        {
            return Ok(Some(staged.clone()));
        }

        Ok(lock_state(&self.state)
            .resources
            .iter()
            .find(|r| r.external_id == external_id)
            .cloned())
    }

    async fn save_resource(&mut self, resource: &ClinicalResource) -> Result<()> {
        match self
            .staged_resources
            .iter_mut()
            .find(|r| r.external_id == resource.external_id)
        {
            Some(staged) => *staged = resource.clone(),
            None => self.staged_resources.push(resource.clone()),
        }
        Ok(())
    }

    async fn save_envelope(&mut self, envelope: &SyncEnvelope) -> Result<()> {
        self.staged_envelopes.push(envelope.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemorySession {
            state,
            staged_resources,
            staged_envelopes,
        } = *self;

        let mut state = lock_state(&state);
        for envelope in staged_envelopes {
            state.apply_envelope(envelope);
        }
        for resource in staged_resources {
            state.apply_resource(resource);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnvelopeKind, PatientId, QueryDescriptor};
    use crate::fhir::Document;
    use chrono::Utc;

    fn resource(external_id: &str, kind: &str) -> ClinicalResource {
        ClinicalResource::builder()
            .external_id(external_id)
            .resource_kind(kind)
            .payload(Document::new())
            .last_updated(Utc::now())
            .build()
            .unwrap()
    }

    fn envelope() -> SyncEnvelope {
        let patient_id = PatientId::new("p1").unwrap();
        SyncEnvelope::new(
            EnvelopeKind::PatientEverything,
            patient_id.clone(),
            Document::new(),
            0,
            &QueryDescriptor::for_patient(&patient_id),
        )
    }

    #[tokio::test]
    async fn test_commit_assigns_local_ids() {
        let store = InMemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.save_resource(&resource("a", "Patient")).await.unwrap();
        session.save_resource(&resource("b", "Condition")).await.unwrap();
        session.save_envelope(&envelope()).await.unwrap();
        session.commit().await.unwrap();

        let resources = store.resources();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].local_id, Some(1));
        assert_eq!(resources[1].local_id, Some(2));
        assert_eq!(store.envelopes()[0].local_id, Some(1));
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible_to_other_sessions() {
        let store = InMemoryStore::new();
        let mut writer = store.begin().await.unwrap();
        writer.save_resource(&resource("a", "Patient")).await.unwrap();

        let mut reader = store.begin().await.unwrap();
        assert!(reader.find_resource_by_external_id("a").await.unwrap().is_none());
        assert!(writer.find_resource_by_external_id("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = InMemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.save_resource(&resource("a", "Patient")).await.unwrap();
        session.save_envelope(&envelope()).await.unwrap();
        session.rollback().await.unwrap();

        assert!(store.resources().is_empty());
        assert_eq!(store.count_envelopes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_session_discards_writes() {
        let store = InMemoryStore::new();
        {
            let mut session = store.begin().await.unwrap();
            session.save_resource(&resource("a", "Patient")).await.unwrap();
        }
        assert!(store.resources().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_local_id_and_kind() {
        let store = InMemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.save_resource(&resource("a", "Patient")).await.unwrap();
        session.commit().await.unwrap();

        let mut stored = store.resource("a").unwrap();
        stored.resource_kind = "Observation".to_string();
        stored
            .payload
            .insert("active".to_string(), serde_json::json!(true));

        let mut session = store.begin().await.unwrap();
        session.save_resource(&stored).await.unwrap();
        session.commit().await.unwrap();

        let resources = store.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].local_id, Some(1));
        assert_eq!(resources[0].resource_kind, "Patient");
        assert_eq!(resources[0].payload.get("active"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_count_resources_by_kind() {
        let store = InMemoryStore::new();
        let mut session = store.begin().await.unwrap();
        for (id, kind) in [("a", "Patient"), ("b", "Observation"), ("c", "Observation")] {
            session.save_resource(&resource(id, kind)).await.unwrap();
        }
        session.commit().await.unwrap();

        let counts = store.count_resources_by_kind().await.unwrap();
        assert_eq!(counts.get("Observation"), Some(&2));
        assert_eq!(counts.get("Patient"), Some(&1));
    }
}
