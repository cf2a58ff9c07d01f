//! Transactional persistence of entities and their audit rows.
//!
//! ## Snapshot semantics
//!
//! Every write happens inside a snapshot (transaction):
//!
//! 1. `begin()` starts a snapshot
//! 2. `lock_for_update` takes an exclusive row lock on the entity and reloads
//!    its committed attributes and audit rows into the in-memory instance
//! 3. `save_entity` / `save_audit_logs` stage writes
//! 4. `commit(snapshot)` makes them durable, or `rollback(snapshot)` drops them
//! 5. after a successful commit the caller calls
//!    [`AuditLogs::mark_persisted`]; until then the rows stay pending
//!
//! A snapshot dropped without commit must roll back and release its locks.

mod memory;

pub use memory::{MemorySnapshot, MemoryStore};

use crate::entity::Auditable;
use crate::error::AuditError;
use crate::repository::AuditLogs;
use tracing::warn;

/// Errors returned by a [`RecordStore`]. The engine propagates them unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {key}")]
    NotFound { key: String },

    #[error("record already exists: {key}")]
    AlreadyExists { key: String },

    #[error("timed out waiting for row lock on {key}")]
    LockTimeout { key: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A store offering transactions with exclusive row locks.
pub trait RecordStore: Send + Sync {
    /// The in-progress transaction type.
    type Snapshot;

    fn begin(&self) -> Result<Self::Snapshot, StoreError>;

    fn commit(&self, snapshot: Self::Snapshot) -> Result<(), StoreError>;

    fn rollback(&self, snapshot: Self::Snapshot) -> Result<(), StoreError>;

    /// Lock the entity's row until the snapshot ends and reload it.
    ///
    /// The reload replaces attributes and the audit collection named
    /// `association` with their committed values. The entity's staged
    /// audits are kept, and its unflushed audit rows are carried over
    /// with [`AuditLogs::carry_pending`].
    fn lock_for_update<E: Auditable>(
        &self,
        snapshot: &mut Self::Snapshot,
        entity: &mut E,
        association: &str,
    ) -> Result<(), StoreError>;

    /// Stage the entity's attributes for commit.
    fn save_entity<E: Auditable>(
        &self,
        snapshot: &mut Self::Snapshot,
        entity: &E,
    ) -> Result<(), StoreError>;

    /// Stage the collection's pending inserts and updates for commit.
    ///
    /// Pending tracking is left untouched so a rolled-back snapshot can be
    /// retried.
    fn save_audit_logs(
        &self,
        snapshot: &mut Self::Snapshot,
        key: &str,
        association: &str,
        logs: &AuditLogs,
    ) -> Result<(), StoreError>;
}

/// Run `body` inside a snapshot: commit on `Ok`, roll back on `Err`.
pub fn transaction<S, T, F>(store: &S, body: F) -> Result<T, AuditError>
where
    S: RecordStore,
    F: FnOnce(&mut S::Snapshot) -> Result<T, AuditError>,
{
    let mut snapshot = store.begin()?;
    match body(&mut snapshot) {
        Ok(value) => {
            store.commit(snapshot)?;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "rolling back snapshot");
            if let Err(rollback) = store.rollback(snapshot) {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}
