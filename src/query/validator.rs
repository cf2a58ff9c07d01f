//! Status validation with error accumulation.
//!
//! A status outside the machine's declared states is a field error, not an
//! `Err`: callers get a [`Validation`] listing every offending attribute.

use crate::entity::Auditable;
use crate::error::AuditError;
use crate::machine::MachineDescriptor;
use crate::trail::AuditTrail;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A status attribute holding an undeclared state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{field} {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn check<E: Auditable>(
    machine: &MachineDescriptor<E>,
    entity: &E,
) -> Validation<(), NonEmptyVec<FieldError>> {
    match entity.status(machine.attribute()) {
        Some(status) if machine.has_state(&status) => Validation::success(()),
        Some(status) => Validation::fail(FieldError {
            field: machine.attribute().to_string(),
            message: format!("is not a state of '{}': {status}", machine.name()),
        }),
        None => Validation::fail(FieldError {
            field: machine.attribute().to_string(),
            message: format!("has no state for '{}'", machine.name()),
        }),
    }
}

impl<E: Auditable> AuditTrail<E> {
    /// Check one machine's status attribute.
    pub fn validate(
        &self,
        entity: &E,
        machine: Option<&str>,
    ) -> Result<Validation<(), NonEmptyVec<FieldError>>, AuditError> {
        let machine = self.machines.resolve(machine)?;
        Ok(check(machine, entity))
    }

    /// Check every machine, accumulating all field errors.
    pub fn validate_all(&self, entity: &E) -> Validation<(), NonEmptyVec<FieldError>> {
        let checks: Vec<_> = self
            .machines
            .machines()
            .iter()
            .map(|machine| check(machine, entity))
            .collect();
        Validation::all_vec(checks).map(|_| ())
    }
}
