//! Core value types for auditing state machine transitions.
//!
//! This module holds the pure pieces the rest of the engine is built on:
//! - Typed state naming via the `State` trait and branch source predicates
//! - Guard predicates over entities
//! - Logical audit entries, messages and transition outcomes
//!
//! Nothing in here touches storage or the actor context.

mod entry;
mod guard;
mod state;

pub use entry::{AuditLogEntry, Edge, Messages, TransitionOutcome};
pub use guard::Guard;
pub use state::{State, StatePredicate};
