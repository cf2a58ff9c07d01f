//! Translation between logical audit fields and physical columns.
//!
//! The engine always speaks the fixed logical vocabulary of [`AuditField`].
//! A [`ColumnMapping`] resolved once at configuration time says which
//! physical column holds each field, and the [`ColumnMapper`] applies it to
//! [`AuditRow`]s.

mod record;

pub use record::{AuditRow, AuditSchema, FieldValue};

use crate::actor::ActorRef;
use crate::core::{AuditLogEntry, Messages};
use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// The logical audit vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditField {
    At,
    Event,
    FromState,
    ToState,
    Reason,
    Messages,
    Actor,
    ActorId,
    MachineName,
}

impl AuditField {
    pub const ALL: [AuditField; 9] = [
        Self::At,
        Self::Event,
        Self::FromState,
        Self::ToState,
        Self::Reason,
        Self::Messages,
        Self::Actor,
        Self::ActorId,
        Self::MachineName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::At => "at",
            Self::Event => "event",
            Self::FromState => "from_state",
            Self::ToState => "to_state",
            Self::Reason => "reason",
            Self::Messages => "messages",
            Self::Actor => "actor",
            Self::ActorId => "actor_id",
            Self::MachineName => "machine_name",
        }
    }
}

impl fmt::Display for AuditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditField {
    type Err = AuditError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| AuditError::UnmappedField(name.to_string()))
    }
}

/// How the messages column stores its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStorage {
    /// One element per message (JSON or array columns).
    #[serde(rename = "array")]
    ArrayBacked,
    /// A single newline-delimited string.
    #[serde(rename = "string")]
    StringBacked,
}

impl MessageStorage {
    /// Infer the representation from a declared column type.
    pub fn infer(declared_type: Option<&str>) -> Self {
        let declared = declared_type.unwrap_or_default().to_ascii_lowercase();
        if declared.contains("json") || declared.contains("[]") || declared.contains("array") {
            Self::ArrayBacked
        } else {
            Self::StringBacked
        }
    }

    pub fn empty(&self) -> Messages {
        match self {
            Self::ArrayBacked => Messages::List(Vec::new()),
            Self::StringBacked => Messages::Text(String::new()),
        }
    }

    /// Convert messages into this representation.
    pub fn normalize(&self, messages: Messages) -> Messages {
        match (self, messages) {
            (Self::ArrayBacked, Messages::Text(text)) if text.is_empty() => {
                Messages::List(Vec::new())
            }
            (Self::ArrayBacked, Messages::Text(text)) => Messages::List(vec![text]),
            (Self::StringBacked, Messages::List(items)) => Messages::Text(items.join("\n")),
            (_, messages) => messages,
        }
    }
}

/// Logical field to physical column table. Unlisted fields keep their logical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<AuditField, String>,
}

impl ColumnMapping {
    pub fn identity() -> Self {
        Self {
            columns: AuditField::ALL
                .into_iter()
                .map(|field| (field, field.as_str().to_string()))
                .collect(),
        }
    }

    /// Build a mapping from a string-keyed remapping table.
    pub fn from_table(table: &BTreeMap<String, String>) -> Result<Self, AuditError> {
        table.iter().try_fold(Self::identity(), |mapping, (field, column)| {
            Ok(mapping.remap(field.parse()?, column.clone()))
        })
    }

    pub fn remap(mut self, field: AuditField, column: impl Into<String>) -> Self {
        self.columns.insert(field, column.into());
        self
    }

    pub fn column(&self, field: AuditField) -> &str {
        self.columns
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.as_str())
    }

    fn is_remapped(&self, field: AuditField) -> bool {
        self.column(field) != field.as_str()
    }

    /// `actor` and `actor_id` are one relationship and must be remapped together.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.is_remapped(AuditField::Actor) != self.is_remapped(AuditField::ActorId) {
            return Err(AuditError::InvalidConfiguration(
                "actor and actor_id must both be remapped or both keep their names".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::identity()
    }
}

/// Reads and writes logical fields on physical audit rows.
#[derive(Debug)]
pub struct ColumnMapper {
    mapping: ColumnMapping,
    schema: AuditSchema,
    configured: Option<MessageStorage>,
    inferred: OnceLock<MessageStorage>,
}

impl ColumnMapper {
    pub fn new(
        mapping: ColumnMapping,
        schema: AuditSchema,
        configured: Option<MessageStorage>,
    ) -> Result<Self, AuditError> {
        mapping.validate()?;
        Ok(Self {
            mapping,
            schema,
            configured,
            inferred: OnceLock::new(),
        })
    }

    pub fn column(&self, field: AuditField) -> &str {
        self.mapping.column(field)
    }

    pub fn schema(&self) -> &AuditSchema {
        &self.schema
    }

    /// Whether the audit record type can tag entries with a machine name.
    pub fn has_machine_column(&self) -> bool {
        self.schema.has_column(self.column(AuditField::MachineName))
    }

    /// Configured representation, or the one inferred from the schema on first use.
    pub fn message_storage(&self) -> MessageStorage {
        if let Some(storage) = self.configured {
            return storage;
        }
        *self.inferred.get_or_init(|| {
            let column = self.column(AuditField::Messages);
            let storage = MessageStorage::infer(self.schema.declared_type(column));
            debug!(column, ?storage, "inferred message storage");
            storage
        })
    }

    pub fn get<'r>(&self, row: &'r AuditRow, field: AuditField) -> &'r FieldValue {
        row.get(self.column(field))
    }

    pub fn set(&self, row: &mut AuditRow, field: AuditField, value: FieldValue) {
        row.set(self.column(field), value);
    }

    /// Translate a logical field map into physical column names.
    pub fn map_fields<'a, I>(&self, fields: I) -> Result<Vec<(String, FieldValue)>, AuditError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        fields
            .into_iter()
            .map(|(name, value)| {
                let field: AuditField = name.parse()?;
                Ok((self.column(field).to_string(), value))
            })
            .collect()
    }

    pub fn write_actor(&self, row: &mut AuditRow, actor: Option<&ActorRef>) {
        let (kind, id) = match actor {
            Some(actor) => (
                FieldValue::Text(actor.kind.clone()),
                FieldValue::Text(actor.id.clone()),
            ),
            None => (FieldValue::Null, FieldValue::Null),
        };
        self.set(row, AuditField::Actor, kind);
        self.set(row, AuditField::ActorId, id);
    }

    pub fn read_actor(&self, row: &AuditRow) -> Option<ActorRef> {
        let kind = self.get(row, AuditField::Actor).as_text()?;
        let id = self.get(row, AuditField::ActorId).as_text()?;
        Some(ActorRef::new(kind, id))
    }

    pub fn write_messages(&self, row: &mut AuditRow, messages: &Messages) {
        let value = match self.message_storage().normalize(messages.clone()) {
            Messages::List(items) => FieldValue::List(items),
            Messages::Text(text) => FieldValue::Text(text),
        };
        self.set(row, AuditField::Messages, value);
    }

    pub fn read_messages(&self, row: &AuditRow) -> Messages {
        match self.get(row, AuditField::Messages) {
            FieldValue::List(items) => Messages::List(items.clone()),
            FieldValue::Text(text) => Messages::Text(text.clone()),
            _ => self.message_storage().empty(),
        }
    }

    fn text(&self, row: &AuditRow, field: AuditField) -> String {
        self.get(row, field).as_text().unwrap_or_default().to_string()
    }

    /// Logical view of a physical row.
    pub fn read_entry(&self, row: &AuditRow) -> AuditLogEntry {
        AuditLogEntry {
            id: row.id(),
            at: self.get(row, AuditField::At).as_time(),
            event: self.text(row, AuditField::Event),
            from_state: self.text(row, AuditField::FromState),
            to_state: self.text(row, AuditField::ToState),
            reason: self.text(row, AuditField::Reason),
            messages: self.read_messages(row),
            actor: self.read_actor(row),
            machine_name: self
                .get(row, AuditField::MachineName)
                .as_text()
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mapper(mapping: ColumnMapping, schema: AuditSchema) -> ColumnMapper {
        ColumnMapper::new(mapping, schema, None).unwrap()
    }

    #[test]
    fn identity_mapping_uses_logical_names() {
        let mapping = ColumnMapping::identity();
        for field in AuditField::ALL {
            assert_eq!(mapping.column(field), field.as_str());
        }
    }

    #[test]
    fn remapped_fields_write_physical_columns() {
        let mapper = mapper(
            ColumnMapping::identity().remap(AuditField::Event, "transition_event"),
            AuditSchema::conventional(),
        );
        let mut row = AuditRow::new();

        mapper.set(&mut row, AuditField::Event, "charge".into());

        assert_eq!(row.get("transition_event").as_text(), Some("charge"));
        assert!(row.get("event").is_null());
        assert_eq!(mapper.read_entry(&row).event, "charge");
    }

    #[test]
    fn asymmetric_actor_remap_is_rejected() {
        let mapping = ColumnMapping::identity().remap(AuditField::Actor, "user");
        let result = ColumnMapper::new(mapping, AuditSchema::conventional(), None);
        assert!(matches!(result, Err(AuditError::InvalidConfiguration(_))));

        let both = ColumnMapping::identity()
            .remap(AuditField::Actor, "user_type")
            .remap(AuditField::ActorId, "user_id");
        assert!(both.validate().is_ok());
    }

    #[test]
    fn map_fields_rejects_unknown_logical_names() {
        let mapper = mapper(
            ColumnMapping::identity().remap(AuditField::Reason, "why"),
            AuditSchema::conventional(),
        );

        let mapped = mapper
            .map_fields([("reason", FieldValue::from("late")), ("event", "ship".into())])
            .unwrap();
        assert_eq!(mapped[0].0, "why");
        assert_eq!(mapped[1].0, "event");

        let err = mapper.map_fields([("colour", FieldValue::Null)]).unwrap_err();
        assert!(matches!(err, AuditError::UnmappedField(name) if name == "colour"));
    }

    #[test]
    fn from_table_parses_field_names() {
        let mut table = BTreeMap::new();
        table.insert("from_state".to_string(), "previous".to_string());
        let mapping = ColumnMapping::from_table(&table).unwrap();
        assert_eq!(mapping.column(AuditField::FromState), "previous");

        table.insert("nope".to_string(), "x".to_string());
        assert!(ColumnMapping::from_table(&table).is_err());
    }

    #[test]
    fn message_storage_is_inferred_from_declared_type() {
        assert_eq!(MessageStorage::infer(Some("jsonb")), MessageStorage::ArrayBacked);
        assert_eq!(MessageStorage::infer(Some("varchar[]")), MessageStorage::ArrayBacked);
        assert_eq!(MessageStorage::infer(Some("ARRAY")), MessageStorage::ArrayBacked);
        assert_eq!(MessageStorage::infer(Some("text")), MessageStorage::StringBacked);
        assert_eq!(MessageStorage::infer(None), MessageStorage::StringBacked);
    }

    #[test]
    fn configured_storage_wins_over_schema() {
        let mapper = ColumnMapper::new(
            ColumnMapping::identity(),
            AuditSchema::conventional(),
            Some(MessageStorage::StringBacked),
        )
        .unwrap();
        assert_eq!(mapper.message_storage(), MessageStorage::StringBacked);
    }

    #[test]
    fn messages_normalize_per_storage() {
        let array = MessageStorage::ArrayBacked;
        let string = MessageStorage::StringBacked;

        assert_eq!(
            array.normalize(Messages::from("note")),
            Messages::List(vec!["note".to_string()])
        );
        assert_eq!(
            string.normalize(Messages::from(vec!["a", "b"])),
            Messages::Text("a\nb".to_string())
        );
        assert_eq!(array.normalize(Messages::from("")), Messages::List(Vec::new()));
    }

    #[test]
    fn actor_round_trips_through_two_columns() {
        let mapper = mapper(
            ColumnMapping::identity()
                .remap(AuditField::Actor, "user_type")
                .remap(AuditField::ActorId, "user_id"),
            AuditSchema::conventional(),
        );
        let mut row = AuditRow::new();
        let actor = ActorRef::new("admin", "3");

        mapper.write_actor(&mut row, Some(&actor));
        assert_eq!(row.get("user_type").as_text(), Some("admin"));
        assert_eq!(row.get("user_id").as_text(), Some("3"));
        assert_eq!(mapper.read_actor(&row), Some(actor));

        mapper.write_actor(&mut row, None);
        assert_eq!(mapper.read_actor(&row), None);
    }

    #[test]
    fn read_entry_collects_logical_fields() {
        let mapper = mapper(ColumnMapping::identity(), AuditSchema::conventional());
        let mut row = AuditRow::new();
        let at = Utc::now();
        mapper.set(&mut row, AuditField::At, at.into());
        mapper.set(&mut row, AuditField::FromState, "pending".into());
        mapper.set(&mut row, AuditField::ToState, "paid".into());
        mapper.write_messages(&mut row, &Messages::from("charged"));

        let entry = mapper.read_entry(&row);
        assert_eq!(entry.at, Some(at));
        assert!(entry.succeeded());
        assert_eq!(entry.messages, Messages::List(vec!["charged".to_string()]));
        assert_eq!(entry.reason, "");
        assert_eq!(entry.machine_name, None);
    }
}
