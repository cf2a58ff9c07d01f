//! The audit trail of one entity type: staging, commit and one-off entries.
//!
//! An [`AuditTrail`] is built once per entity type through
//! [`AuditTrailBuilder`] and then shared by every operation on that type.
//! It owns the resolved machine registry, the column mapping and the named
//! timestamp definitions; per-entity state (staged audits, the audit
//! collection) always lives on the entity itself.
//!
//! # Commit protocol
//!
//! After every transition attempt the outcome is handed to
//! [`AuditTrail::commit`]:
//!
//! 1. The outcome's machine is resolved (multi-machine entities must name it)
//! 2. The staged audit for that machine is taken, and guard notes appended
//! 3. An existing entry on the same `(event, from_state, to_state)` edge is
//!    updated in place, so repeated failing attempts collapse into one row
//! 4. Otherwise a new entry is appended to the audit collection

mod builder;

pub use builder::{AuditConfig, AuditTrailBuilder, TimestampConfig};

use crate::actor::{ActorContext, ActorRef};
use crate::columns::{AuditField, AuditRow, ColumnMapper, FieldValue};
use crate::core::{AuditLogEntry, Messages, TransitionOutcome};
use crate::entity::Auditable;
use crate::error::AuditError;
use crate::machine::{MachineDescriptor, MachineRegistry};
use crate::query::TimestampDefinition;
use crate::repository::{AuditLogs, AuditRepository};
use crate::staging::StagedAudit;
use crate::store::{transaction, RecordStore};
use chrono::Utc;
use tracing::{debug, info};

/// Resolved audit configuration for entity type `E`.
pub struct AuditTrail<E> {
    pub(crate) machines: MachineRegistry<E>,
    pub(crate) association: String,
    pub(crate) mapper: ColumnMapper,
    pub(crate) timestamps: Vec<TimestampDefinition>,
}

/// Entity state captured right after the row lock.
///
/// Restored when the snapshot rolls back, so the in-memory entity matches
/// what the store still holds.
pub(crate) struct Checkpoint {
    statuses: Vec<(String, Option<String>)>,
    logs: AuditLogs,
}

/// An out-of-band note recorded without firing an event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneOff {
    pub event: String,
    pub messages: Messages,
    pub reason: Option<String>,
    pub machine: Option<String>,
}

impl OneOff {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    /// A single message or an ordered list of them.
    pub fn messages(mut self, messages: impl Into<Messages>) -> Self {
        self.messages = messages.into();
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn on(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }
}

impl<E: Auditable> AuditTrail<E> {
    pub fn builder() -> AuditTrailBuilder<E> {
        AuditTrailBuilder::new()
    }

    pub fn machines(&self) -> &MachineRegistry<E> {
        &self.machines
    }

    pub fn association(&self) -> &str {
        &self.association
    }

    pub fn mapper(&self) -> &ColumnMapper {
        &self.mapper
    }

    /// Resolve a machine by name, or the default when `None`.
    pub fn machine(&self, name: Option<&str>) -> Result<&MachineDescriptor<E>, AuditError> {
        self.machines.resolve(name)
    }

    pub fn logs<'e>(&self, entity: &'e E) -> Result<&'e AuditLogs, AuditError> {
        entity
            .audit_logs(&self.association)
            .ok_or_else(|| self.missing_association())
    }

    pub fn logs_mut<'e>(&self, entity: &'e mut E) -> Result<&'e mut AuditLogs, AuditError> {
        let association = self.association.as_str();
        entity
            .audit_logs_mut(association)
            .ok_or_else(|| self.missing_association())
    }

    /// Mapper-aware access to the entity's audit collection.
    pub fn repository<'a>(&'a self, entity: &'a mut E) -> Result<AuditRepository<'a>, AuditError> {
        let logs = self.logs_mut(entity)?;
        Ok(AuditRepository::new(logs, &self.mapper))
    }

    fn missing_association(&self) -> AuditError {
        AuditError::InvalidConfiguration(format!(
            "entity does not expose the audit association '{}'",
            self.association
        ))
    }

    /// Append a message to the machine's staged audit, optionally replacing its reason.
    pub fn audit<'e>(
        &self,
        entity: &'e mut E,
        message: &str,
        reason: Option<&str>,
        machine: Option<&str>,
    ) -> Result<&'e StagedAudit, AuditError> {
        let machine = self.machines.resolve(machine)?;
        let storage = self.mapper.message_storage();
        Ok(entity
            .staging_mut()
            .audit(machine.name(), storage, message, reason))
    }

    /// The machine's staged audit, created empty on first access.
    pub fn staged<'e>(
        &self,
        entity: &'e mut E,
        machine: Option<&str>,
    ) -> Result<&'e mut StagedAudit, AuditError> {
        let machine = self.machines.resolve(machine)?;
        let storage = self.mapper.message_storage();
        Ok(entity.staging_mut().current(machine.name(), storage))
    }

    /// The machine's staged audit, if any, without creating one.
    pub fn peek_staged<'e>(
        &self,
        entity: &'e E,
        machine: Option<&str>,
    ) -> Result<Option<&'e StagedAudit>, AuditError> {
        let machine = self.machines.resolve(machine)?;
        Ok(entity.staging().peek(machine.name()))
    }

    /// Discard the machine's staged audit without committing it.
    pub fn clear_staged(&self, entity: &mut E, machine: Option<&str>) -> Result<(), AuditError> {
        let machine = self.machines.resolve(machine)?;
        entity.staging_mut().clear(machine.name());
        Ok(())
    }

    /// Record a transition attempt in the entity's audit collection.
    ///
    /// The entry is only appended in memory and marked pending; the
    /// processor flushes it inside the same snapshot as the entity and
    /// undoes it if that snapshot rolls back.
    pub fn commit(
        &self,
        entity: &mut E,
        outcome: &TransitionOutcome,
        actors: &ActorContext,
    ) -> Result<AuditLogEntry, AuditError> {
        let requested = Some(outcome.machine.as_str()).filter(|name| !name.is_empty());
        let machine = self.machines.resolve(requested)?.name().to_string();
        let key = entity.key();
        self.logs(entity)?;

        let mut staged = entity
            .staging_mut()
            .take(&machine, self.mapper.message_storage());
        for note in &outcome.notes {
            staged.note(note);
        }

        let edge = outcome.edge();
        let multi = self.machines.is_multi();
        let actor = actors.current().cloned();
        let mut repository = self.repository(entity)?;

        let existing = repository.find(|entry| {
            entry.edge() == edge
                && (!multi || entry.machine_name.as_deref() == Some(machine.as_str()))
        });

        if let Some(existing) = existing {
            let updated = repository.update_with(existing.id, |mapper, row| {
                stamp(mapper, row, actor.as_ref(), &staged);
            });
            if let Some(entry) = updated {
                debug!(
                    entity = %key,
                    machine = %machine,
                    event = %edge.event,
                    from = %edge.from,
                    to = %edge.to,
                    "updated existing audit entry"
                );
                return Ok(entry);
            }
        }

        let record_machine = self.mapper.has_machine_column();
        let entry = repository.insert_with(|mapper, row| {
            mapper.set(row, AuditField::Event, edge.event.as_str().into());
            mapper.set(row, AuditField::FromState, edge.from.as_str().into());
            mapper.set(row, AuditField::ToState, edge.to.as_str().into());
            if record_machine {
                mapper.set(row, AuditField::MachineName, machine.as_str().into());
            }
            stamp(mapper, row, actor.as_ref(), &staged);
        });

        if outcome.succeeded {
            info!(entity = %key, machine = %machine, event = %edge.event, from = %edge.from, to = %edge.to, "transition audited");
        } else {
            debug!(entity = %key, machine = %machine, event = %edge.event, state = %edge.from, "failed attempt audited");
        }
        Ok(entry)
    }

    /// Insert and persist a note that does not correspond to a transition.
    ///
    /// Runs in its own snapshot: the row is locked and reloaded first, so
    /// the entry's `from_state` and `to_state` are both the machine's
    /// committed status and it always reads as failed. Unflushed rows of
    /// the collection are written along with it.
    pub fn one_off<S: RecordStore>(
        &self,
        store: &S,
        entity: &mut E,
        request: &OneOff,
        actors: &ActorContext,
    ) -> Result<AuditLogEntry, AuditError> {
        let machine = self.machines.resolve(request.machine.as_deref())?;
        let record_machine = self.mapper.has_machine_column().then(|| machine.name().to_string());
        let key = entity.key();
        let staged = StagedAudit {
            messages: request.messages.clone(),
            reason: request.reason.clone().unwrap_or_default(),
        };
        let actor = actors.current().cloned();

        let mut checkpoint = None;
        let result = transaction(store, |snapshot| {
            store.lock_for_update(snapshot, entity, &self.association)?;
            checkpoint = Some(self.checkpoint(entity)?);

            let state = entity.status(machine.attribute()).unwrap_or_default();
            let entry = self.repository(entity)?.insert_with(|mapper, row| {
                mapper.set(row, AuditField::Event, request.event.as_str().into());
                mapper.set(row, AuditField::FromState, state.as_str().into());
                mapper.set(row, AuditField::ToState, state.as_str().into());
                if let Some(name) = record_machine {
                    mapper.set(row, AuditField::MachineName, name.into());
                }
                stamp(mapper, row, actor.as_ref(), &staged);
            });

            store.save_audit_logs(snapshot, &key, &self.association, self.logs(entity)?)?;
            Ok(entry)
        });

        match result {
            Ok(entry) => {
                self.logs_mut(entity)?.mark_persisted();
                debug!(entity = %key, event = %request.event, state = %entry.from_state, "one-off audit recorded");
                Ok(entry)
            }
            Err(err) => {
                if let Some(checkpoint) = checkpoint {
                    self.restore(entity, checkpoint);
                }
                Err(err)
            }
        }
    }

    /// Capture the status attributes and audit collection of a freshly locked entity.
    pub(crate) fn checkpoint(&self, entity: &E) -> Result<Checkpoint, AuditError> {
        let statuses = self
            .machines
            .machines()
            .iter()
            .map(|machine| {
                let attribute = machine.attribute();
                (attribute.to_string(), entity.status(attribute))
            })
            .collect();
        Ok(Checkpoint {
            statuses,
            logs: self.logs(entity)?.clone(),
        })
    }

    /// Put the entity back to a checkpoint taken under the same row lock.
    pub(crate) fn restore(&self, entity: &mut E, checkpoint: Checkpoint) {
        for (attribute, state) in &checkpoint.statuses {
            if let Some(state) = state {
                entity.set_status(attribute, state);
            }
        }
        if let Some(logs) = entity.audit_logs_mut(&self.association) {
            *logs = checkpoint.logs;
        }
    }

    /// Every entry in collection order.
    pub fn entries(&self, entity: &E) -> Result<Vec<AuditLogEntry>, AuditError> {
        Ok(self.logs(entity)?.entries(&self.mapper))
    }

    /// Entries tagged with `machine`.
    pub fn find_by_machine(&self, entity: &E, machine: &str) -> Result<Vec<AuditLogEntry>, AuditError> {
        let machine = self.machines.resolve(Some(machine))?.name();
        Ok(self
            .entries(entity)?
            .into_iter()
            .filter(|entry| entry.machine_name.as_deref() == Some(machine))
            .collect())
    }

    /// The most recent entry, optionally restricted to one machine.
    pub fn last_entry(
        &self,
        entity: &E,
        machine: Option<&str>,
    ) -> Result<Option<AuditLogEntry>, AuditError> {
        let entries = match machine {
            Some(machine) => self.find_by_machine(entity, machine)?,
            None => self.entries(entity)?,
        };
        Ok(entries.into_iter().max_by_key(|entry| entry.at))
    }
}

fn stamp(mapper: &ColumnMapper, row: &mut AuditRow, actor: Option<&ActorRef>, staged: &StagedAudit) {
    mapper.set(row, AuditField::At, FieldValue::Time(Utc::now()));
    mapper.write_actor(row, actor);
    mapper.write_messages(row, &staged.messages);
    mapper.set(row, AuditField::Reason, staged.reason.as_str().into());
}
