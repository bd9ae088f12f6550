//! Store abstraction traits
//!
//! Every store backend implements [`ResourceStore`]. Writes happen inside a
//! [`StoreSession`], which is all-or-nothing: committed as a whole, rolled
//! back as a whole, or discarded when dropped unfinished.

use crate::domain::{ClinicalResource, Result, SyncEnvelope};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Persistence store for clinical resources and sync envelopes
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and indexes if they do not exist yet
    async fn ensure_schema(&self) -> Result<()>;

    /// Open a new write session
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Persistence` if no session can be started.
    async fn begin(&self) -> Result<Box<dyn StoreSession>>;

    /// Number of stored resources per `resourceType`
    async fn count_resources_by_kind(&self) -> Result<BTreeMap<String, i64>>;

    /// Number of stored envelopes
    async fn count_envelopes(&self) -> Result<i64>;

    /// Whether sessions are backed by real transactions
    fn supports_transactions(&self) -> bool;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// A single all-or-nothing write session
///
/// Reads see the session's own uncommitted writes. Dropping a session without
/// calling [`commit`](StoreSession::commit) or
/// [`rollback`](StoreSession::rollback) discards every write made through it.
#[async_trait]
pub trait StoreSession: Send {
    /// Look up a resource by its FHIR logical id
    async fn find_resource_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<ClinicalResource>>;

    /// Insert a new resource (`local_id == None`) or update an existing one
    async fn save_resource(&mut self, resource: &ClinicalResource) -> Result<()>;

    /// Insert an envelope
    async fn save_envelope(&mut self, envelope: &SyncEnvelope) -> Result<()>;

    /// Make every write in this session durable
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write in this session
    async fn rollback(self: Box<Self>) -> Result<()>;
}
