//! Transactional execution of events with audit commit.
//!
//! Every attempt runs inside one store snapshot:
//!
//! ```text
//! begin -> lock row (reload) -> fire event -> commit audit -> save entity
//!       -> save audit rows -> commit snapshot
//! ```
//!
//! The snapshot commits whether or not the event transitioned, so the
//! entity's status and its audit row are always written together. Only an
//! error (store failure, unknown event or machine) rolls it back. The
//! entity's status and audit collection are then restored to what the lock
//! loaded, and its staged audits are discarded.

use crate::actor::ActorContext;
use crate::core::TransitionOutcome;
use crate::entity::Auditable;
use crate::error::AuditError;
use crate::machine::{DescriptorEngine, TransitionEngine};
use crate::store::{transaction, RecordStore};
use crate::trail::AuditTrail;
use serde_json::Value;
use tracing::{debug, info_span, warn};

/// A request to fire one event.
///
/// ```rust
/// use state_audit::processor::Fire;
///
/// let fire = Fire::event("ship").on("delivery").arg("express").arg(3);
/// assert_eq!(fire.machine.as_deref(), Some("delivery"));
/// assert_eq!(fire.args.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Fire {
    pub event: String,
    /// Machine to fire on. Inferred from the event when `None`.
    pub machine: Option<String>,
    pub args: Vec<Value>,
}

impl Fire {
    pub fn event(name: impl Into<String>) -> Self {
        Self {
            event: name.into(),
            machine: None,
            args: Vec::new(),
        }
    }

    pub fn on(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.args.extend(values);
        self
    }
}

/// Runs events against entities of type `E` stored in `S`.
pub struct TransitionProcessor<'a, E, S, G = DescriptorEngine> {
    trail: &'a AuditTrail<E>,
    store: &'a S,
    engine: G,
}

impl<'a, E, S> TransitionProcessor<'a, E, S, DescriptorEngine>
where
    E: Auditable,
    S: RecordStore,
{
    pub fn new(trail: &'a AuditTrail<E>, store: &'a S) -> Self {
        Self {
            trail,
            store,
            engine: DescriptorEngine,
        }
    }
}

impl<'a, E, S, G> TransitionProcessor<'a, E, S, G>
where
    E: Auditable,
    S: RecordStore,
    G: TransitionEngine<E>,
{
    /// Replace the engine that executes events.
    pub fn with_engine<H: TransitionEngine<E>>(self, engine: H) -> TransitionProcessor<'a, E, S, H> {
        TransitionProcessor {
            trail: self.trail,
            store: self.store,
            engine,
        }
    }

    /// Fire the event and report whether the entity transitioned.
    ///
    /// A rejected event returns `Ok(false)`; its audit entry is persisted
    /// all the same.
    pub fn process(&self, entity: &mut E, fire: &Fire, actors: &ActorContext) -> Result<bool, AuditError> {
        let outcome = self.run(entity, fire, actors, |_| true)?;
        Ok(outcome.map_or(true, |outcome| outcome.succeeded))
    }

    /// Fire the event, failing with [`AuditError::FailedTransition`] if it does not transition.
    ///
    /// The error carries the last message of the most recent audit entry.
    pub fn must_process(&self, entity: &mut E, fire: &Fire, actors: &ActorContext) -> Result<(), AuditError> {
        let outcome = self.run(entity, fire, actors, |_| true)?;
        self.ensure_transitioned(entity, outcome)
    }

    /// Lock the row, then fire only if `predicate` holds on the reloaded entity.
    ///
    /// A false predicate is a successful no-op. A rejected event fails as
    /// in [`must_process`](Self::must_process).
    pub fn process_if<P>(
        &self,
        entity: &mut E,
        fire: &Fire,
        actors: &ActorContext,
        predicate: P,
    ) -> Result<(), AuditError>
    where
        P: FnOnce(&E) -> bool,
    {
        let outcome = self.run(entity, fire, actors, predicate)?;
        self.ensure_transitioned(entity, outcome)
    }

    fn ensure_transitioned(
        &self,
        entity: &E,
        outcome: Option<TransitionOutcome>,
    ) -> Result<(), AuditError> {
        let outcome = match outcome {
            Some(outcome) if !outcome.succeeded => outcome,
            _ => return Ok(()),
        };

        let machine = self
            .trail
            .machines()
            .is_multi()
            .then_some(outcome.machine.as_str());
        let message = self
            .trail
            .last_entry(entity, machine)?
            .and_then(|entry| entry.last_message().map(str::to_string));

        Err(AuditError::FailedTransition {
            event: outcome.event,
            message,
        })
    }

    fn run<P>(
        &self,
        entity: &mut E,
        fire: &Fire,
        actors: &ActorContext,
        predicate: P,
    ) -> Result<Option<TransitionOutcome>, AuditError>
    where
        P: FnOnce(&E) -> bool,
    {
        let key = entity.key();
        let span = info_span!("process", entity = %key, event = %fire.event);
        let _entered = span.enter();

        let machine = match fire.machine.as_deref() {
            Some(name) => self.trail.machine(Some(name))?,
            None => self.trail.machines().resolve_for_event(&fire.event)?,
        };
        let association = self.trail.association();

        let mut checkpoint = None;
        let result = transaction(self.store, |snapshot| {
            self.store.lock_for_update(snapshot, entity, association)?;
            checkpoint = Some(self.trail.checkpoint(entity)?);
            if !predicate(entity) {
                debug!(machine = machine.name(), "predicate declined; event not fired");
                return Ok(None);
            }

            let outcome = self.engine.fire(entity, machine, &fire.event, &fire.args)?;
            self.trail.commit(entity, &outcome, actors)?;

            self.store.save_entity(snapshot, entity)?;
            let logs = self.trail.logs(entity)?;
            self.store.save_audit_logs(snapshot, &key, association, logs)?;
            Ok(Some(outcome))
        });

        match &result {
            Ok(Some(_)) => self.trail.logs_mut(entity)?.mark_persisted(),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "processing failed; entity restored to committed state");
                if let Some(checkpoint) = checkpoint {
                    self.trail.restore(entity, checkpoint);
                }
                entity.staging_mut().clear_all();
            }
        }
        result
    }
}
