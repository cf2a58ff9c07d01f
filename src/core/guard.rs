//! Guard predicates deciding whether a branch may fire.

use serde_json::Value;
use std::fmt;

type Predicate<E> = Box<dyn Fn(&E, &[Value]) -> bool + Send + Sync>;

/// Pure predicate over an entity and the arguments an event was fired with.
///
/// A guard may carry a note. When the guard rejects a branch the engine
/// reports the note in the transition outcome, and it ends up in the audit
/// entry's messages.
///
/// # Example
///
/// ```rust
/// use state_audit::core::Guard;
///
/// struct Order {
///     total: u64,
/// }
///
/// let free = Guard::new(|order: &Order| order.total == 0).with_note("order total is not zero");
///
/// assert!(free.check(&Order { total: 0 }, &[]));
/// assert!(!free.check(&Order { total: 10 }, &[]));
/// assert_eq!(free.note(), Some("order total is not zero"));
/// ```
pub struct Guard<E> {
    predicate: Predicate<E>,
    note: Option<String>,
}

impl<E> Guard<E> {
    /// Create a guard from a predicate over the entity.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(move |entity, _| predicate(entity)),
            note: None,
        }
    }

    /// Create a guard that also inspects the event arguments.
    pub fn with_args<F>(predicate: F) -> Self
    where
        F: Fn(&E, &[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            note: None,
        }
    }

    /// Attach the note reported when this guard rejects.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn check(&self, entity: &E, args: &[Value]) -> bool {
        (self.predicate)(entity, args)
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

impl<E> fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("note", &self.note).finish()
    }
}
