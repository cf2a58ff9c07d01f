//! The audit collection an entity owns, and mapper-aware access to it.

use crate::columns::{AuditRow, ColumnMapper, FieldValue};
use crate::core::AuditLogEntry;
use crate::error::AuditError;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Audit rows belonging to one entity.
///
/// Mirrors what the store holds for the entity. Inserts and in-place
/// updates are tracked as pending until the store acknowledges them with
/// [`mark_persisted`](Self::mark_persisted).
#[derive(Clone, Debug, Default)]
pub struct AuditLogs {
    rows: Vec<AuditRow>,
    pending: BTreeSet<Uuid>,
}

impl AuditLogs {
    /// A collection loaded from the store, with nothing pending.
    pub fn from_persisted(rows: Vec<AuditRow>) -> Self {
        Self {
            rows,
            pending: BTreeSet::new(),
        }
    }

    pub fn rows(&self) -> &[AuditRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn append(&mut self, row: AuditRow) {
        self.pending.insert(row.id());
        self.rows.push(row);
    }

    /// Apply `change` to the row with `id`. Returns false if no such row exists.
    pub fn update<F>(&mut self, id: Uuid, change: F) -> bool
    where
        F: FnOnce(&mut AuditRow),
    {
        match self.rows.iter_mut().find(|row| row.id() == id) {
            Some(row) => {
                change(row);
                self.pending.insert(id);
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Rows changed since the last acknowledged flush, in collection order.
    pub fn pending_rows(&self) -> Vec<AuditRow> {
        self.rows
            .iter()
            .filter(|row| self.pending.contains(&row.id()))
            .cloned()
            .collect()
    }

    /// Acknowledge that the pending rows are durable.
    pub fn mark_persisted(&mut self) {
        self.pending.clear();
    }

    /// Re-apply the pending rows of `stale` on top of this freshly loaded collection.
    ///
    /// Used when a row lock reloads the entity, so that changes not yet
    /// flushed are written with the next snapshot instead of being lost.
    pub fn carry_pending(&mut self, stale: &AuditLogs) {
        for row in stale.pending_rows() {
            let id = row.id();
            match self.rows.iter().position(|existing| existing.id() == id) {
                Some(index) => {
                    self.rows[index] = row;
                    self.pending.insert(id);
                }
                None => self.append(row),
            }
        }
    }

    /// Logical entries in collection order.
    pub fn entries(&self, mapper: &ColumnMapper) -> Vec<AuditLogEntry> {
        self.rows.iter().map(|row| mapper.read_entry(row)).collect()
    }
}

/// Create, update and find audit entries of one entity through a column mapper.
pub struct AuditRepository<'a> {
    logs: &'a mut AuditLogs,
    mapper: &'a ColumnMapper,
}

impl<'a> AuditRepository<'a> {
    pub fn new(logs: &'a mut AuditLogs, mapper: &'a ColumnMapper) -> Self {
        Self { logs, mapper }
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.logs.entries(self.mapper)
    }

    /// First entry satisfying `predicate`, compared on logical values.
    pub fn find<P>(&self, predicate: P) -> Option<AuditLogEntry>
    where
        P: Fn(&AuditLogEntry) -> bool,
    {
        self.logs
            .rows()
            .iter()
            .map(|row| self.mapper.read_entry(row))
            .find(|entry| predicate(entry))
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<AuditLogEntry>
    where
        P: Fn(&AuditLogEntry) -> bool,
    {
        self.logs
            .rows()
            .iter()
            .map(|row| self.mapper.read_entry(row))
            .filter(|entry| predicate(entry))
            .collect()
    }

    /// Build a row through `fill` and append it to the collection.
    pub fn insert_with<F>(&mut self, fill: F) -> AuditLogEntry
    where
        F: FnOnce(&ColumnMapper, &mut AuditRow),
    {
        let mut row = AuditRow::new();
        fill(self.mapper, &mut row);
        let entry = self.mapper.read_entry(&row);
        self.logs.append(row);
        entry
    }

    /// Create an entry from a logical field map such as `[("event", "note".into())]`.
    ///
    /// The row stays pending until the next processed event or one-off
    /// flushes the collection.
    pub fn create<'f, I>(&mut self, fields: I) -> Result<AuditLogEntry, AuditError>
    where
        I: IntoIterator<Item = (&'f str, FieldValue)>,
    {
        let columns = self.mapper.map_fields(fields)?;
        Ok(self.insert_with(|_, row| {
            for (column, value) in columns {
                row.set(column, value);
            }
        }))
    }

    /// Change the row with `id` in place.
    pub fn update_with<F>(&mut self, id: Uuid, change: F) -> Option<AuditLogEntry>
    where
        F: FnOnce(&ColumnMapper, &mut AuditRow),
    {
        let mapper = self.mapper;
        let mut updated = None;
        self.logs.update(id, |row| {
            change(mapper, row);
            updated = Some(mapper.read_entry(row));
        });
        updated
    }
}
