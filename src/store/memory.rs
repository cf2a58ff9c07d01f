//! In-memory [`RecordStore`] with real exclusive row locks.

use super::{RecordStore, StoreError};
use crate::columns::AuditRow;
use crate::entity::Auditable;
use crate::repository::AuditLogs;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Default)]
struct StoredRow {
    attributes: Value,
    audit: BTreeMap<String, Vec<AuditRow>>,
}

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, StoredRow>,
    locked: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Mutex<Tables>,
    released: Condvar,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn release(&self, keys: &mut Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let mut tables = self.tables();
        for key in keys.drain(..) {
            tables.locked.remove(&key);
        }
        self.released.notify_all();
    }
}

/// Store keeping entity rows and audit rows in process memory.
///
/// Cloning the store shares the same tables.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<Inner>,
    lock_timeout: Duration,
}

/// Transaction of a [`MemoryStore`]. Writes stay private until commit.
#[derive(Debug)]
pub struct MemorySnapshot {
    inner: Arc<Inner>,
    locks: Vec<String>,
    writes: HashMap<String, StoredRow>,
}

impl Drop for MemorySnapshot {
    fn drop(&mut self) {
        self.inner.release(&mut self.locks);
    }
}

impl MemorySnapshot {
    /// The row as this snapshot sees it, copied on first write.
    fn row_mut(&mut self, key: &str) -> Result<&mut StoredRow, StoreError> {
        if !self.writes.contains_key(key) {
            let committed = self
                .inner
                .tables()
                .rows
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    key: key.to_string(),
                })?;
            self.writes.insert(key.to_string(), committed);
        }
        self.writes.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    fn row(&self, key: &str) -> Result<StoredRow, StoreError> {
        if let Some(row) = self.writes.get(key) {
            return Ok(row.clone());
        }
        self.inner
            .tables()
            .rows
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// How long `lock_for_update` waits for a row held by another snapshot.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Create the entity's row.
    pub fn insert<E: Auditable>(&self, entity: &E) -> Result<(), StoreError> {
        let key = entity.key();
        let attributes =
            serde_json::to_value(entity).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tables = self.inner.tables();
        if tables.rows.contains_key(&key) {
            return Err(StoreError::AlreadyExists { key });
        }
        tables.rows.insert(
            key,
            StoredRow {
                attributes,
                audit: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Load a committed entity with its audit collection.
    pub fn load<E: Auditable>(&self, key: &str, association: &str) -> Result<E, StoreError> {
        let row = self
            .inner
            .tables()
            .rows
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        hydrate(row, association)
    }

    /// Committed audit rows of an entity.
    pub fn audit_rows(&self, key: &str, association: &str) -> Vec<AuditRow> {
        self.inner
            .tables()
            .rows
            .get(key)
            .and_then(|row| row.audit.get(association).cloned())
            .unwrap_or_default()
    }

    fn acquire(&self, snapshot: &mut MemorySnapshot, key: &str) -> Result<(), StoreError> {
        if snapshot.locks.iter().any(|held| held == key) {
            return Ok(());
        }

        let deadline = Instant::now() + self.lock_timeout;
        let mut tables = self.inner.tables();
        while tables.locked.contains(key) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(StoreError::LockTimeout {
                    key: key.to_string(),
                });
            }
            tables = match self.inner.released.wait_timeout(tables, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        tables.locked.insert(key.to_string());
        snapshot.locks.push(key.to_string());
        debug!(key, "row locked");
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn hydrate<E: Auditable>(row: StoredRow, association: &str) -> Result<E, StoreError> {
    let mut entity: E = serde_json::from_value(row.attributes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let rows = row.audit.get(association).cloned().unwrap_or_default();
    if let Some(logs) = entity.audit_logs_mut(association) {
        *logs = AuditLogs::from_persisted(rows);
    }
    Ok(entity)
}

impl RecordStore for MemoryStore {
    type Snapshot = MemorySnapshot;

    fn begin(&self) -> Result<MemorySnapshot, StoreError> {
        Ok(MemorySnapshot {
            inner: Arc::clone(&self.inner),
            locks: Vec::new(),
            writes: HashMap::new(),
        })
    }

    fn commit(&self, mut snapshot: MemorySnapshot) -> Result<(), StoreError> {
        let writes = std::mem::take(&mut snapshot.writes);
        {
            let mut tables = self.inner.tables();
            for (key, row) in writes {
                tables.rows.insert(key, row);
            }
        }
        self.inner.release(&mut snapshot.locks);
        Ok(())
    }

    fn rollback(&self, mut snapshot: MemorySnapshot) -> Result<(), StoreError> {
        snapshot.writes.clear();
        self.inner.release(&mut snapshot.locks);
        Ok(())
    }

    fn lock_for_update<E: Auditable>(
        &self,
        snapshot: &mut MemorySnapshot,
        entity: &mut E,
        association: &str,
    ) -> Result<(), StoreError> {
        let key = entity.key();
        self.acquire(snapshot, &key)?;

        let mut fresh: E = hydrate(snapshot.row(&key)?, association)?;
        *fresh.staging_mut() = std::mem::take(entity.staging_mut());
        if let (Some(stale), Some(logs)) = (
            entity.audit_logs(association),
            fresh.audit_logs_mut(association),
        ) {
            logs.carry_pending(stale);
        }
        *entity = fresh;
        Ok(())
    }

    fn save_entity<E: Auditable>(
        &self,
        snapshot: &mut MemorySnapshot,
        entity: &E,
    ) -> Result<(), StoreError> {
        let attributes =
            serde_json::to_value(entity).map_err(|e| StoreError::Serialization(e.to_string()))?;
        snapshot.row_mut(&entity.key())?.attributes = attributes;
        Ok(())
    }

    fn save_audit_logs(
        &self,
        snapshot: &mut MemorySnapshot,
        key: &str,
        association: &str,
        logs: &AuditLogs,
    ) -> Result<(), StoreError> {
        if !logs.has_pending() {
            return Ok(());
        }

        let stored = snapshot
            .row_mut(key)?
            .audit
            .entry(association.to_string())
            .or_default();
        for row in logs.pending_rows() {
            match stored.iter_mut().find(|existing| existing.id() == row.id()) {
                Some(existing) => *existing = row,
                None => stored.push(row),
            }
        }
        Ok(())
    }
}
