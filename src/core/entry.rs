//! Logical audit entries and transition outcomes.
//!
//! These are the values the engine reasons about. Physical storage goes
//! through [`ColumnMapper`](crate::columns::ColumnMapper), which translates an
//! [`AuditLogEntry`] to and from whatever columns the audit record type uses.

use crate::actor::ActorRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages attached to an audit entry.
///
/// Array-capable storage keeps one element per message; string storage keeps
/// a single newline-delimited string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Messages {
    List(Vec<String>),
    Text(String),
}

impl Messages {
    /// Append a message, preserving call order.
    pub fn push(&mut self, message: &str) {
        match self {
            Self::List(items) => items.push(message.to_string()),
            Self::Text(text) => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(items) => items.is_empty(),
            Self::Text(text) => text.is_empty(),
        }
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&str> {
        match self {
            Self::List(items) => items.last().map(String::as_str),
            Self::Text(text) if text.is_empty() => None,
            Self::Text(text) => text.rsplit('\n').next(),
        }
    }

    /// Messages as individual lines regardless of representation.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => text.split('\n').map(str::to_string).collect(),
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<&str> for Messages {
    fn from(message: &str) -> Self {
        Self::Text(message.to_string())
    }
}

impl From<String> for Messages {
    fn from(message: String) -> Self {
        Self::Text(message)
    }
}

impl From<Vec<String>> for Messages {
    fn from(messages: Vec<String>) -> Self {
        Self::List(messages)
    }
}

impl From<Vec<&str>> for Messages {
    fn from(messages: Vec<&str>) -> Self {
        Self::List(messages.into_iter().map(str::to_string).collect())
    }
}

/// One possible outcome of firing an event: `(event, from_state, to_state)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub event: String,
    pub from: String,
    pub to: String,
}

/// What the transition engine reports after every attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub machine: String,
    pub event: String,
    pub from: String,
    pub to: String,
    pub succeeded: bool,
    /// Notes from rejecting guards, folded into the staged audit on commit.
    pub notes: Vec<String>,
}

impl TransitionOutcome {
    pub fn transitioned(
        machine: impl Into<String>,
        event: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            machine: machine.into(),
            event: event.into(),
            from: from.into(),
            to: to.into(),
            succeeded: true,
            notes: Vec::new(),
        }
    }

    /// A failed attempt leaves the entity where it was, so `to == from`.
    pub fn rejected(
        machine: impl Into<String>,
        event: impl Into<String>,
        state: impl Into<String>,
        notes: Vec<String>,
    ) -> Self {
        let state = state.into();
        Self {
            machine: machine.into(),
            event: event.into(),
            from: state.clone(),
            to: state,
            succeeded: false,
            notes,
        }
    }

    pub fn edge(&self) -> Edge {
        Edge {
            event: self.event.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

/// Logical view of one persisted audit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub at: Option<DateTime<Utc>>,
    pub event: String,
    pub from_state: String,
    pub to_state: String,
    pub reason: String,
    pub messages: Messages,
    pub actor: Option<ActorRef>,
    pub machine_name: Option<String>,
}

impl AuditLogEntry {
    /// An entry whose state did not change. One-off notes count as failed too.
    pub fn failed(&self) -> bool {
        self.from_state == self.to_state
    }

    pub fn succeeded(&self) -> bool {
        !self.failed()
    }

    pub fn edge(&self) -> Edge {
        Edge {
            event: self.event.clone(),
            from: self.from_state.clone(),
            to: self.to_state.clone(),
        }
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last()
    }
}
