//! Fluent builders for machine descriptors.

use super::{Branch, EventDescriptor, MachineDescriptor};
use crate::core::{Guard, State, StatePredicate};
use crate::error::AuditError;

/// Builder for a single branch of an event.
pub struct BranchBuilder<E> {
    from: Option<StatePredicate>,
    to: Option<String>,
    guard: Option<Guard<E>>,
}

impl<E> BranchBuilder<E> {
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            guard: None,
        }
    }

    /// Set the source predicate (required).
    pub fn from(mut self, predicate: StatePredicate) -> Self {
        self.from = Some(predicate);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    pub fn guard(mut self, guard: Guard<E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    pub fn build(self) -> Result<Branch<E>, AuditError> {
        let from = self.from.ok_or_else(|| {
            AuditError::InvalidConfiguration(
                "branch source not specified. Call .from(predicate)".to_string(),
            )
        })?;
        let to = self.to.ok_or_else(|| {
            AuditError::InvalidConfiguration(
                "branch target state not specified. Call .to(state)".to_string(),
            )
        })?;

        Ok(Branch {
            from,
            to,
            guard: self.guard,
        })
    }
}

impl<E> Default for BranchBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an event with one or more branches.
pub struct EventBuilder<E> {
    name: String,
    branches: Vec<Branch<E>>,
    errors: Vec<AuditError>,
}

impl<E> EventBuilder<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add an unguarded branch.
    pub fn transition(mut self, from: StatePredicate, to: impl Into<String>) -> Self {
        self.branches.push(Branch {
            from,
            to: to.into(),
            guard: None,
        });
        self
    }

    /// Add a branch guarded by `guard`.
    pub fn guarded(mut self, from: StatePredicate, to: impl Into<String>, guard: Guard<E>) -> Self {
        self.branches.push(Branch {
            from,
            to: to.into(),
            guard: Some(guard),
        });
        self
    }

    /// Add a branch from a builder. Build errors surface from [`build`](Self::build).
    pub fn branch(mut self, builder: BranchBuilder<E>) -> Self {
        match builder.build() {
            Ok(branch) => self.branches.push(branch),
            Err(err) => self.errors.push(err),
        }
        self
    }

    pub fn build(mut self) -> Result<EventDescriptor<E>, AuditError> {
        if let Some(err) = self.errors.pop() {
            return Err(err);
        }
        if self.branches.is_empty() {
            return Err(AuditError::InvalidConfiguration(format!(
                "event '{}' has no branches",
                self.name
            )));
        }

        Ok(EventDescriptor {
            name: self.name,
            branches: self.branches,
        })
    }
}

/// Builder for a machine descriptor.
///
/// # Example
///
/// ```rust
/// use state_audit::core::StatePredicate;
/// use state_audit::machine::{EventBuilder, MachineBuilder, MachineDescriptor};
///
/// struct Ticket;
///
/// let machine: MachineDescriptor<Ticket> = MachineBuilder::new("status")
///     .states(["open", "closed"])
///     .event(EventBuilder::new("close").transition(StatePredicate::state("open"), "closed"))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.attribute(), "status");
/// ```
pub struct MachineBuilder<E> {
    name: String,
    attribute: Option<String>,
    states: Vec<String>,
    events: Vec<EventDescriptor<E>>,
}

impl<E> MachineBuilder<E> {
    /// Start a machine. The status attribute defaults to the machine name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: None,
            states: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn states<I, N>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Declare states from a typed state enum.
    pub fn typed_states<S: State>(mut self, states: &[S]) -> Self {
        self.states
            .extend(states.iter().map(|s| s.name().to_string()));
        self
    }

    /// Add an event. Returns an error if the event builder fails validation.
    pub fn event(mut self, builder: EventBuilder<E>) -> Result<Self, AuditError> {
        let event = builder.build()?;
        if self.events.iter().any(|e| e.name == event.name) {
            return Err(AuditError::InvalidConfiguration(format!(
                "event '{}' declared twice on machine '{}'",
                event.name, self.name
            )));
        }
        self.events.push(event);
        Ok(self)
    }

    /// Build the descriptor. Every branch target must be a declared state.
    pub fn build(self) -> Result<MachineDescriptor<E>, AuditError> {
        if self.states.is_empty() {
            return Err(AuditError::InvalidConfiguration(format!(
                "machine '{}' declares no states",
                self.name
            )));
        }

        let undeclared = self
            .events
            .iter()
            .flat_map(|e| e.branches.iter().map(move |b| (e, b)))
            .find(|(_, b)| !self.states.contains(&b.to));
        if let Some((event, branch)) = undeclared {
            return Err(AuditError::InvalidConfiguration(format!(
                "event '{}' targets undeclared state '{}'",
                event.name, branch.to
            )));
        }

        Ok(MachineDescriptor {
            attribute: self.attribute.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            states: self.states,
            events: self.events,
        })
    }
}
