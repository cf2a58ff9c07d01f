//! The contract an entity implements to have its transitions audited.

use crate::machine::MachineRegistry;
use crate::repository::AuditLogs;
use crate::staging::AuditStaging;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The conventional name of the audit association.
pub const DEFAULT_ASSOCIATION: &str = "audit_logs";

/// An entity whose lifecycle is governed by one or more state machines.
///
/// Entities are serializable so a [`RecordStore`](crate::store::RecordStore)
/// can persist their attributes. The staging buffer and audit collections
/// are not attributes; skip them when serializing.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use state_audit::core::StatePredicate;
/// use state_audit::entity::Auditable;
/// use state_audit::machine::{EventBuilder, MachineBuilder, MachineRegistry};
/// use state_audit::repository::AuditLogs;
/// use state_audit::staging::AuditStaging;
///
/// #[derive(Serialize, Deserialize)]
/// struct Ticket {
///     id: String,
///     status: String,
///     #[serde(skip)]
///     staging: AuditStaging,
///     #[serde(skip)]
///     audit_logs: AuditLogs,
/// }
///
/// impl Auditable for Ticket {
///     fn key(&self) -> String {
///         self.id.clone()
///     }
///
///     fn machines() -> MachineRegistry<Self> {
///         let machine = MachineBuilder::new("status")
///             .states(["open", "closed"])
///             .event(EventBuilder::new("close").transition(StatePredicate::state("open"), "closed"))
///             .and_then(|builder| builder.build())
///             .expect("ticket machine is valid");
///         MachineRegistry::single(machine)
///     }
///
///     fn status(&self, _attribute: &str) -> Option<String> {
///         Some(self.status.clone())
///     }
///
///     fn set_status(&mut self, _attribute: &str, state: &str) {
///         self.status = state.to_string();
///     }
///
///     fn staging(&self) -> &AuditStaging {
///         &self.staging
///     }
///
///     fn staging_mut(&mut self) -> &mut AuditStaging {
///         &mut self.staging
///     }
///
///     fn audit_logs(&self, _association: &str) -> Option<&AuditLogs> {
///         Some(&self.audit_logs)
///     }
///
///     fn audit_logs_mut(&mut self, _association: &str) -> Option<&mut AuditLogs> {
///         Some(&mut self.audit_logs)
///     }
/// }
/// ```
pub trait Auditable: Serialize + DeserializeOwned + Send {
    /// Primary key used for row locking.
    fn key(&self) -> String;

    /// The machine registry of this entity type.
    fn machines() -> MachineRegistry<Self>
    where
        Self: Sized;

    /// Audit associations this entity type declares.
    fn associations() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[DEFAULT_ASSOCIATION]
    }

    /// Current value of a status attribute. `None` when unset.
    fn status(&self, attribute: &str) -> Option<String>;

    fn set_status(&mut self, attribute: &str, state: &str);

    fn staging(&self) -> &AuditStaging;

    fn staging_mut(&mut self) -> &mut AuditStaging;

    fn audit_logs(&self, association: &str) -> Option<&AuditLogs>;

    fn audit_logs_mut(&mut self, association: &str) -> Option<&mut AuditLogs>;
}
