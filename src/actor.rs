//! Actor attribution for audit entries.
//!
//! The current actor is an explicit value passed to every call that can write
//! an audit entry. Each thread or task owns its own [`ActorContext`], so
//! concurrent operations never observe each other's actor.

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weak reference to whoever performed an action.
///
/// Stored in two physical columns: `actor` holds the kind and `actor_id`
/// holds the identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub kind: String,
    pub id: String,
}

impl ActorRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Who is currently performing actions.
///
/// # Example
///
/// ```rust
/// use state_audit::actor::{ActorContext, ActorRef};
///
/// let mut context = ActorContext::default();
/// let admin = ActorRef::new("user", "42");
///
/// let seen = context
///     .with_actor(Some(admin.clone()), |ctx| ctx.current().cloned())
///     .unwrap();
///
/// assert_eq!(seen, Some(admin));
/// assert!(context.current().is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorContext {
    current: Option<ActorRef>,
}

impl ActorContext {
    /// A context already acting as `actor`.
    pub fn acting_as(actor: ActorRef) -> Self {
        Self {
            current: Some(actor),
        }
    }

    pub fn current(&self) -> Option<&ActorRef> {
        self.current.as_ref()
    }

    /// Run `body` with `actor` as the current actor, then restore the prior value.
    ///
    /// Restoration happens on every exit path, including a panic inside
    /// `body`. Requesting a non-nil actor while another non-nil actor is
    /// active fails with [`AuditError::CurrentActorAlreadySet`].
    pub fn with_actor<T, F>(&mut self, actor: Option<ActorRef>, body: F) -> Result<T, AuditError>
    where
        F: FnOnce(&ActorContext) -> T,
    {
        if actor.is_some() && self.current.is_some() {
            return Err(AuditError::CurrentActorAlreadySet);
        }

        let prior = std::mem::replace(&mut self.current, actor);
        let scope = Restore {
            context: self,
            prior: Some(prior),
        };
        Ok(body(&*scope.context))
    }
}

struct Restore<'a> {
    context: &'a mut ActorContext,
    prior: Option<Option<ActorRef>>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            self.context.current = prior;
        }
    }
}
