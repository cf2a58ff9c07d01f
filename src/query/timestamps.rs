//! Derived timestamps: when did the entity take a given edge.

use crate::core::AuditLogEntry;
use crate::entity::Auditable;
use crate::error::AuditError;
use crate::trail::AuditTrail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Matches succeeded entries by event and states. `None` matches anything.
///
/// ```rust
/// use state_audit::query::TimestampFilter;
///
/// let filter = TimestampFilter::new().event("settle").to("paid");
/// assert_eq!(filter.to.as_deref(), Some("paid"));
/// assert!(filter.from.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampFilter {
    pub event: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub machine: Option<String>,
}

impl TimestampFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    pub fn on(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Whether the entry's edge satisfies every set filter.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        fn accepts(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |expected| expected == value)
        }

        accepts(&self.event, &entry.event)
            && accepts(&self.from, &entry.from_state)
            && accepts(&self.to, &entry.to_state)
    }
}

/// A timestamp lookup registered under a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampDefinition {
    pub name: String,
    pub filter: TimestampFilter,
}

impl<E: Auditable> AuditTrail<E> {
    /// `at` of the first succeeded entry matching `filter`, in collection order.
    ///
    /// Failed entries, one-off notes included, never match.
    pub fn timestamp_where(
        &self,
        entity: &E,
        filter: &TimestampFilter,
    ) -> Result<Option<DateTime<Utc>>, AuditError> {
        let machine = self.machines.resolve(filter.machine.as_deref())?.name();
        let multi = self.machines.is_multi();

        Ok(self
            .logs(entity)?
            .entries(&self.mapper)
            .into_iter()
            .filter(|entry| !multi || entry.machine_name.as_deref() == Some(machine))
            .find(|entry| entry.succeeded() && filter.matches(entry))
            .and_then(|entry| entry.at))
    }

    /// Evaluate the timestamp registered as `name`.
    ///
    /// When several definitions share the name, the last one that finds
    /// an entry wins. The history is scanned on every call.
    pub fn timestamp_of(&self, entity: &E, name: &str) -> Result<Option<DateTime<Utc>>, AuditError> {
        let mut definitions = self
            .timestamps
            .iter()
            .filter(|definition| definition.name == name)
            .peekable();
        if definitions.peek().is_none() {
            return Err(AuditError::UnknownTimestamp(name.to_string()));
        }

        let mut found = None;
        for definition in definitions {
            if let Some(at) = self.timestamp_where(entity, &definition.filter)? {
                found = Some(at);
            }
        }
        debug!(name, found = found.is_some(), "timestamp lookup");
        Ok(found)
    }

    /// Registered timestamp names, without duplicates.
    pub fn timestamp_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for definition in &self.timestamps {
            if !names.contains(&definition.name.as_str()) {
                names.push(&definition.name);
            }
        }
        names
    }
}
