//! The boundary to whatever executes transitions.

use super::MachineDescriptor;
use crate::core::TransitionOutcome;
use crate::entity::Auditable;
use crate::error::AuditError;
use serde_json::Value;
use tracing::debug;

/// Executes an event against an entity and reports what happened.
///
/// The engine owns guard evaluation and the status mutation. It must report
/// every attempt, successful or not, as a [`TransitionOutcome`]; a rejected
/// attempt is an `Ok` outcome with `succeeded == false`, never an error.
pub trait TransitionEngine<E> {
    fn fire(
        &self,
        entity: &mut E,
        machine: &MachineDescriptor<E>,
        event: &str,
        args: &[Value],
    ) -> Result<TransitionOutcome, AuditError>;
}

/// Engine that walks a descriptor's branches in declaration order.
///
/// The first branch whose source predicate matches the current status and
/// whose guard passes wins. Notes of guards that rejected along the way are
/// reported in the outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorEngine;

impl<E: Auditable> TransitionEngine<E> for DescriptorEngine {
    fn fire(
        &self,
        entity: &mut E,
        machine: &MachineDescriptor<E>,
        event: &str,
        args: &[Value],
    ) -> Result<TransitionOutcome, AuditError> {
        let descriptor = machine.require_event(event)?;
        let status = entity.status(machine.attribute());
        let from = status.clone().unwrap_or_default();
        let mut notes = Vec::new();

        for branch in descriptor.branches() {
            if !branch.from().matches(status.as_deref()) {
                continue;
            }
            if let Some(guard) = branch.guard() {
                if !guard.check(entity, args) {
                    notes.extend(guard.note().map(str::to_string));
                    continue;
                }
            }

            entity.set_status(machine.attribute(), branch.to());
            debug!(machine = machine.name(), event, from = %from, to = branch.to(), "branch taken");
            return Ok(TransitionOutcome::transitioned(
                machine.name(),
                event,
                from,
                branch.to(),
            ));
        }

        debug!(machine = machine.name(), event, from = %from, "no branch applies");
        Ok(TransitionOutcome::rejected(machine.name(), event, from, notes))
    }
}
