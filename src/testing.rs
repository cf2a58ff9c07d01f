//! Helpers for asserting machine behaviour in tests.

use crate::entity::Auditable;
use crate::error::AuditError;
use crate::trail::AuditTrail;
use serde_json::Value;

/// Checks whether an event can take an entity to a target state.
///
/// Branch sources are matched against the entity's status, or against an
/// explicit `from` state. Guards are evaluated on the entity with the given
/// arguments. Nothing is mutated.
///
/// ```rust
/// use state_audit::testing::TransitionCheck;
///
/// let check = TransitionCheck::event("close").from("open").to("closed");
/// assert_eq!(check.target(), Some("closed"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionCheck {
    event: String,
    machine: Option<String>,
    from: Option<String>,
    to: Option<String>,
    args: Vec<Value>,
}

impl TransitionCheck {
    pub fn event(name: impl Into<String>) -> Self {
        Self {
            event: name.into(),
            ..Self::default()
        }
    }

    pub fn on(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Pretend the entity is in `state`.
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn check<E: Auditable>(&self, trail: &AuditTrail<E>, entity: &E) -> Result<bool, AuditError> {
        let target = self.to.as_deref().ok_or(AuditError::MissingTargetState)?;
        let machine = match self.machine.as_deref() {
            Some(name) => trail.machine(Some(name))?,
            None => trail.machines().resolve_for_event(&self.event)?,
        };
        let status = match &self.from {
            Some(state) => Some(state.clone()),
            None => entity.status(machine.attribute()),
        };

        let event = machine.require_event(&self.event)?;
        Ok(event.branches().iter().any(|branch| {
            branch.to() == target
                && branch.from().matches(status.as_deref())
                && branch.guard().map_or(true, |guard| guard.check(entity, &self.args))
        }))
    }
}
