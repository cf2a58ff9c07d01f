//! State Audit: transactional audit trails for state machine transitions
//!
//! Every attempt to fire an event on an entity, successful or not, produces
//! exactly one durable audit entry that is written in the same store
//! snapshot as the entity's status change.
//!
//! # Core Concepts
//!
//! - **Machines**: read-only descriptors of states, events and guarded branches
//! - **Staging**: messages and a reason accumulated before a transition commits
//! - **Commit**: repeated failures on one edge collapse into a single entry
//! - **Actors**: an explicit context value attributing entries to whoever acted
//! - **Queries**: derived timestamps, status validation and reachability
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use state_audit::actor::ActorContext;
//! use state_audit::core::StatePredicate;
//! use state_audit::entity::Auditable;
//! use state_audit::machine::{EventBuilder, MachineBuilder, MachineRegistry};
//! use state_audit::processor::{Fire, TransitionProcessor};
//! use state_audit::repository::AuditLogs;
//! use state_audit::staging::AuditStaging;
//! use state_audit::store::MemoryStore;
//! use state_audit::trail::AuditTrail;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Door {
//!     id: String,
//!     status: String,
//!     #[serde(skip)]
//!     staging: AuditStaging,
//!     #[serde(skip)]
//!     audit_logs: AuditLogs,
//! }
//!
//! impl Auditable for Door {
//!     fn key(&self) -> String {
//!         self.id.clone()
//!     }
//!
//!     fn machines() -> MachineRegistry<Self> {
//!         let machine = MachineBuilder::new("status")
//!             .states(["closed", "open"])
//!             .event(EventBuilder::new("open").transition(StatePredicate::state("closed"), "open"))
//!             .and_then(|builder| builder.build())
//!             .expect("door machine is valid");
//!         MachineRegistry::single(machine)
//!     }
//!
//!     fn status(&self, _attribute: &str) -> Option<String> {
//!         Some(self.status.clone())
//!     }
//!
//!     fn set_status(&mut self, _attribute: &str, state: &str) {
//!         self.status = state.to_string();
//!     }
//!
//!     fn staging(&self) -> &AuditStaging {
//!         &self.staging
//!     }
//!
//!     fn staging_mut(&mut self) -> &mut AuditStaging {
//!         &mut self.staging
//!     }
//!
//!     fn audit_logs(&self, _association: &str) -> Option<&AuditLogs> {
//!         Some(&self.audit_logs)
//!     }
//!
//!     fn audit_logs_mut(&mut self, _association: &str) -> Option<&mut AuditLogs> {
//!         Some(&mut self.audit_logs)
//!     }
//! }
//!
//! let trail = AuditTrail::<Door>::builder().build().unwrap();
//! let store = MemoryStore::new();
//! let mut door = Door {
//!     id: "front".to_string(),
//!     status: "closed".to_string(),
//!     staging: AuditStaging::default(),
//!     audit_logs: AuditLogs::default(),
//! };
//! store.insert(&door).unwrap();
//!
//! trail.audit(&mut door, "badge 117 scanned", None, None).unwrap();
//! let processor = TransitionProcessor::new(&trail, &store);
//! let opened = processor
//!     .process(&mut door, &Fire::event("open"), &ActorContext::default())
//!     .unwrap();
//!
//! assert!(opened);
//! let entry = trail.last_entry(&door, None).unwrap().unwrap();
//! assert_eq!(entry.to_state, "open");
//! assert_eq!(entry.last_message(), Some("badge 117 scanned"));
//! ```

pub mod actor;
pub mod columns;
pub mod core;
pub mod entity;
pub mod error;
pub mod machine;
pub mod processor;
pub mod query;
pub mod repository;
pub mod staging;
pub mod store;
pub mod testing;
pub mod trail;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use actor::{ActorContext, ActorRef};
pub use core::{AuditLogEntry, Guard, Messages, State, StatePredicate, TransitionOutcome};
pub use entity::Auditable;
pub use error::AuditError;
pub use processor::{Fire, TransitionProcessor};
pub use store::{MemoryStore, RecordStore, StoreError};
pub use trail::{AuditTrail, AuditTrailBuilder, OneOff};
