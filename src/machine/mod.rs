//! Read-only descriptors of the state machines an entity runs.
//!
//! The transition algorithm belongs to a [`TransitionEngine`]. This module
//! only describes machines: their status attribute, declared states, and
//! each event's branches. Descriptors are what reachability checks and state
//! validation inspect.

mod builder;
mod engine;
pub mod macros;

pub use builder::{BranchBuilder, EventBuilder, MachineBuilder};
pub use engine::{DescriptorEngine, TransitionEngine};

use crate::core::{Guard, StatePredicate};
use crate::error::AuditError;

/// One possible outcome of an event.
pub struct Branch<E> {
    pub(crate) from: StatePredicate,
    pub(crate) to: String,
    pub(crate) guard: Option<Guard<E>>,
}

impl<E> Branch<E> {
    pub fn from(&self) -> &StatePredicate {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn guard(&self) -> Option<&Guard<E>> {
        self.guard.as_ref()
    }
}

/// An event and its branches, in declaration order.
pub struct EventDescriptor<E> {
    pub(crate) name: String,
    pub(crate) branches: Vec<Branch<E>>,
}

impl<E> EventDescriptor<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branches(&self) -> &[Branch<E>] {
        &self.branches
    }

    /// Whether any branch's source predicate accepts `status`. Guards are not evaluated.
    pub fn can_fire_from(&self, status: Option<&str>) -> bool {
        self.branches.iter().any(|b| b.from.matches(status))
    }
}

/// One machine: the status attribute it governs, its states and events.
pub struct MachineDescriptor<E> {
    pub(crate) name: String,
    pub(crate) attribute: String,
    pub(crate) states: Vec<String>,
    pub(crate) events: Vec<EventDescriptor<E>>,
}

impl<E> MachineDescriptor<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    pub fn events(&self) -> &[EventDescriptor<E>] {
        &self.events
    }

    pub fn event(&self, name: &str) -> Option<&EventDescriptor<E>> {
        self.events.iter().find(|e| e.name == name)
    }

    /// The event named `name`, or an error listing the legal events.
    pub fn require_event(&self, name: &str) -> Result<&EventDescriptor<E>, AuditError> {
        self.event(name).ok_or_else(|| AuditError::UnknownEvent {
            event: name.to_string(),
            machine: self.name.clone(),
            legal: self
                .events
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Every machine registered on an entity type.
pub struct MachineRegistry<E> {
    machines: Vec<MachineDescriptor<E>>,
    default: Option<String>,
}

impl<E> MachineRegistry<E> {
    pub fn new(machines: Vec<MachineDescriptor<E>>) -> Self {
        Self {
            machines,
            default: None,
        }
    }

    /// Registry with a single machine.
    pub fn single(machine: MachineDescriptor<E>) -> Self {
        Self::new(vec![machine])
    }

    pub fn machines(&self) -> &[MachineDescriptor<E>] {
        &self.machines
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn is_multi(&self) -> bool {
        self.machines.len() > 1
    }

    pub fn get(&self, name: &str) -> Option<&MachineDescriptor<E>> {
        self.machines.iter().find(|m| m.name == name)
    }

    pub fn default_machine(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub(crate) fn set_default(&mut self, name: Option<String>) {
        self.default = name;
    }

    fn known(&self) -> String {
        self.machines
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look a machine up by name, falling back to the default or sole machine.
    pub fn resolve(&self, name: Option<&str>) -> Result<&MachineDescriptor<E>, AuditError> {
        let name = name.or(self.default.as_deref());
        match name {
            Some(name) => self.get(name).ok_or_else(|| AuditError::UnknownMachine {
                name: name.to_string(),
                known: self.known(),
            }),
            None => match self.machines.as_slice() {
                [only] => Ok(only),
                [] => Err(AuditError::InvalidConfiguration(
                    "no state machine registered".to_string(),
                )),
                _ => Err(AuditError::MachineRequired {
                    known: self.known(),
                }),
            },
        }
    }

    /// The machine an event belongs to when no machine is named.
    ///
    /// Picks the only machine declaring `event`; otherwise falls back to
    /// [`resolve`](Self::resolve) with no name.
    pub fn resolve_for_event(&self, event: &str) -> Result<&MachineDescriptor<E>, AuditError> {
        let mut declaring = self.machines.iter().filter(|m| m.event(event).is_some());
        match (declaring.next(), declaring.next()) {
            (Some(machine), None) => Ok(machine),
            _ => self.resolve(None),
        }
    }
}
