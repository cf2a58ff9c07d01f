//! Builder and declarative configuration for [`AuditTrail`].

use super::AuditTrail;
use crate::columns::{AuditField, AuditSchema, ColumnMapper, ColumnMapping, MessageStorage};
use crate::entity::{Auditable, DEFAULT_ASSOCIATION};
use crate::error::AuditError;
use crate::machine::MachineRegistry;
use crate::query::{TimestampDefinition, TimestampFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Serializable audit configuration.
///
/// Every field has a default, so an empty document is a valid config:
///
/// ```rust
/// use state_audit::trail::AuditConfig;
///
/// let config: AuditConfig = serde_json::from_str(r#"{ "columns": { "event": "name" } }"#).unwrap();
/// assert_eq!(config.association, "audit_logs");
/// assert_eq!(config.columns["event"], "name");
/// assert!(config.messages.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Default machine for calls that do not name one.
    pub status_machine: Option<String>,
    pub association: String,
    /// Logical field name to physical column name.
    pub columns: BTreeMap<String, String>,
    /// Message storage; inferred from the schema when absent.
    pub messages: Option<MessageStorage>,
    pub timestamps: Vec<TimestampConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            status_machine: None,
            association: DEFAULT_ASSOCIATION.to_string(),
            columns: BTreeMap::new(),
            messages: None,
            timestamps: Vec::new(),
        }
    }
}

/// A named timestamp definition in an [`AuditConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimestampConfig {
    pub name: String,
    #[serde(flatten)]
    pub filter: TimestampFilter,
}

/// Fluent builder for [`AuditTrail`].
///
/// All contradictions are reported by [`build`](Self::build) as
/// [`AuditError::InvalidConfiguration`].
pub struct AuditTrailBuilder<E> {
    machines: Option<MachineRegistry<E>>,
    status_machine: Option<String>,
    association: String,
    mapping: ColumnMapping,
    schema: AuditSchema,
    message_storage: Option<MessageStorage>,
    timestamps: Vec<TimestampDefinition>,
}

impl<E: Auditable> AuditTrailBuilder<E> {
    pub fn new() -> Self {
        Self {
            machines: None,
            status_machine: None,
            association: DEFAULT_ASSOCIATION.to_string(),
            mapping: ColumnMapping::identity(),
            schema: AuditSchema::conventional(),
            message_storage: None,
            timestamps: Vec::new(),
        }
    }

    /// Start from a declarative config.
    pub fn from_config(config: AuditConfig) -> Result<Self, AuditError> {
        let mut builder = Self::new()
            .association(config.association)
            .mapping(ColumnMapping::from_table(&config.columns)?);
        builder.status_machine = config.status_machine;
        builder.message_storage = config.messages;
        for timestamp in config.timestamps {
            builder = builder.timestamp(timestamp.name, timestamp.filter);
        }
        Ok(builder)
    }

    /// Use `machines` instead of the entity type's own registry.
    pub fn machines(mut self, machines: MachineRegistry<E>) -> Self {
        self.machines = Some(machines);
        self
    }

    /// Machine used when a call does not name one.
    pub fn status_machine(mut self, name: impl Into<String>) -> Self {
        self.status_machine = Some(name.into());
        self
    }

    pub fn association(mut self, name: impl Into<String>) -> Self {
        self.association = name.into();
        self
    }

    pub fn mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Store `field` in `column`.
    pub fn remap(mut self, field: AuditField, column: impl Into<String>) -> Self {
        self.mapping = self.mapping.remap(field, column);
        self
    }

    /// Declared columns of the audit record type.
    pub fn schema(mut self, schema: AuditSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn message_storage(mut self, storage: MessageStorage) -> Self {
        self.message_storage = Some(storage);
        self
    }

    /// Register a named timestamp lookup.
    pub fn timestamp(mut self, name: impl Into<String>, filter: TimestampFilter) -> Self {
        self.timestamps.push(TimestampDefinition {
            name: name.into(),
            filter,
        });
        self
    }

    pub fn build(self) -> Result<AuditTrail<E>, AuditError> {
        let mut machines = self.machines.unwrap_or_else(E::machines);
        if machines.is_empty() {
            return Err(invalid("no state machine registered on the entity type"));
        }

        if let Some(name) = &self.status_machine {
            if machines.get(name).is_none() {
                return Err(invalid(format!("status machine '{name}' is not registered")));
            }
        }
        machines.set_default(self.status_machine);

        if !E::associations().contains(&self.association.as_str()) {
            return Err(invalid(format!(
                "audit association '{}' is not declared by the entity type",
                self.association
            )));
        }

        let mapper = ColumnMapper::new(self.mapping, self.schema, self.message_storage)?;
        if machines.is_multi() && !mapper.has_machine_column() {
            return Err(invalid(format!(
                "entity runs several machines but the audit schema has no '{}' column",
                mapper.column(AuditField::MachineName)
            )));
        }

        for definition in &self.timestamps {
            machines
                .resolve(definition.filter.machine.as_deref())
                .map_err(|err| invalid(format!("timestamp '{}': {err}", definition.name)))?;
        }

        debug!(
            machines = machines.machines().len(),
            association = %self.association,
            "audit trail configured"
        );

        Ok(AuditTrail {
            machines,
            association: self.association,
            mapper,
            timestamps: self.timestamps,
        })
    }
}

impl<E: Auditable> Default for AuditTrailBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: impl Into<String>) -> AuditError {
    AuditError::InvalidConfiguration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Order, Parcel};

    fn invalid_message(result: Result<AuditTrail<impl Auditable>, AuditError>) -> String {
        match result {
            Err(AuditError::InvalidConfiguration(message)) => message,
            Err(other) => panic!("expected invalid configuration, got {other}"),
            Ok(_) => panic!("expected invalid configuration, got a trail"),
        }
    }

    #[test]
    fn defaults_build_for_single_machine() {
        let trail = AuditTrail::<Order>::builder().build().unwrap();

        assert_eq!(trail.association(), "audit_logs");
        assert_eq!(trail.machine(None).unwrap().name(), "status");
        assert_eq!(trail.mapper().message_storage(), MessageStorage::ArrayBacked);
    }

    #[test]
    fn empty_registry_is_rejected() {
        let result = AuditTrail::<Order>::builder()
            .machines(MachineRegistry::new(Vec::new()))
            .build();

        assert!(invalid_message(result).contains("no state machine"));
    }

    #[test]
    fn unknown_status_machine_is_rejected() {
        let result = AuditTrail::<Order>::builder().status_machine("billing").build();

        assert!(invalid_message(result).contains("billing"));
    }

    #[test]
    fn undeclared_association_is_rejected() {
        let result = AuditTrail::<Order>::builder().association("history").build();

        assert!(invalid_message(result).contains("history"));
    }

    #[test]
    fn asymmetric_actor_remap_is_rejected() {
        let result = AuditTrail::<Order>::builder()
            .remap(AuditField::Actor, "performed_by_type")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn multi_machine_requires_machine_column() {
        let result = AuditTrail::<Parcel>::builder()
            .schema(AuditSchema::conventional())
            .build();

        assert!(invalid_message(result).contains("machine_name"));
    }

    #[test]
    fn ambiguous_timestamp_is_rejected() {
        let result = AuditTrail::<Parcel>::builder()
            .schema(Parcel::schema())
            .timestamp("delivered_at", TimestampFilter::new().to("delivered"))
            .build();

        assert!(invalid_message(result).contains("delivered_at"));
    }

    #[test]
    fn status_machine_resolves_ambiguity() {
        let trail = AuditTrail::<Parcel>::builder()
            .schema(Parcel::schema())
            .status_machine("delivery")
            .timestamp("delivered_at", TimestampFilter::new().to("delivered"))
            .build()
            .unwrap();

        assert_eq!(trail.machines().default_machine(), Some("delivery"));
        assert_eq!(trail.machine(None).unwrap().name(), "delivery");
    }

    #[test]
    fn config_document_drives_builder() {
        let config: AuditConfig = serde_json::from_value(serde_json::json!({
            "columns": { "event": "transition", "messages": "notes" },
            "messages": "string",
            "timestamps": [{ "name": "paid_at", "to": "paid" }]
        }))
        .unwrap();

        let trail = AuditTrailBuilder::<Order>::from_config(config)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(trail.mapper().column(AuditField::Event), "transition");
        assert_eq!(trail.mapper().message_storage(), MessageStorage::StringBacked);
        assert_eq!(trail.timestamp_names(), vec!["paid_at"]);
    }

    #[test]
    fn config_with_unknown_field_fails() {
        let config = AuditConfig {
            columns: BTreeMap::from([("colour".to_string(), "c".to_string())]),
            ..AuditConfig::default()
        };

        let err = AuditTrailBuilder::<Order>::from_config(config).err().unwrap();
        assert!(matches!(err, AuditError::UnmappedField(_)));
    }
}
