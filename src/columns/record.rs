//! Physical audit rows and the schema describing their columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Value stored in one audit column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Time(DateTime<Utc>),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(at) => Some(*at),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Time(at)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(text: Option<String>) -> Self {
        text.map_or(Self::Null, Self::Text)
    }
}

/// One persisted audit record, keyed by physical column name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    id: Uuid,
    columns: BTreeMap<String, FieldValue>,
}

impl AuditRow {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            columns: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Column value, `Null` when the column was never written.
    pub fn get(&self, column: &str) -> &FieldValue {
        const NULL: &FieldValue = &FieldValue::Null;
        self.columns.get(column).unwrap_or(NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: FieldValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for AuditRow {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared columns of an audit record type and their storage type names.
///
/// Type names are whatever the store declares (`"text"`, `"jsonb"`,
/// `"varchar[]"`, ...). They are only inspected to infer how messages are
/// stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSchema {
    columns: BTreeMap<String, String>,
}

impl AuditSchema {
    pub fn new() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    /// The conventional audit table: identity column names, JSON messages.
    pub fn conventional() -> Self {
        Self::new()
            .column("at", "timestamp")
            .column("event", "varchar")
            .column("from_state", "varchar")
            .column("to_state", "varchar")
            .column("reason", "text")
            .column("messages", "json")
            .column("actor", "varchar")
            .column("actor_id", "varchar")
    }

    pub fn column(mut self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        self.columns.insert(name.into(), declared_type.into());
        self
    }

    pub fn declared_type(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

impl Default for AuditSchema {
    fn default() -> Self {
        Self::conventional()
    }
}
