//! Entities shared by the integration tests.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use state_audit::columns::AuditSchema;
use state_audit::core::{Guard, State, StatePredicate};
use state_audit::entity::Auditable;
use state_audit::machine::{EventBuilder, MachineBuilder, MachineRegistry};
use state_audit::repository::AuditLogs;
use state_audit::staging::AuditStaging;
use state_audit::state_enum;
use state_audit::store::{MemoryStore, RecordStore};
use state_audit::trail::AuditTrail;

state_enum! {
    pub enum InvoiceState {
        Pending = "pending",
        Charging = "charging",
        Paid = "paid",
        Void = "void",
    }
    final: [Paid, Void]
}

/// `pending -> paid` when free, `pending -> charging -> paid` once approved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub status: String,
    pub total: u64,
    pub approved: bool,
    #[serde(skip)]
    pub staging: AuditStaging,
    #[serde(skip)]
    pub audit_logs: AuditLogs,
}

impl Invoice {
    pub fn new(id: &str, total: u64) -> Self {
        Self {
            id: id.to_string(),
            status: InvoiceState::Pending.name().to_string(),
            total,
            approved: false,
            staging: AuditStaging::default(),
            audit_logs: AuditLogs::default(),
        }
    }

    pub fn state(&self) -> Option<InvoiceState> {
        InvoiceState::from_name(&self.status)
    }
}

impl Auditable for Invoice {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn machines() -> MachineRegistry<Self> {
        use InvoiceState::*;

        let machine = MachineBuilder::new("status")
            .typed_states(InvoiceState::ALL)
            .event(
                EventBuilder::new("charge")
                    .guarded(
                        StatePredicate::typed(&[Pending]),
                        Paid.name(),
                        Guard::new(|invoice: &Invoice| invoice.total == 0),
                    )
                    .transition(StatePredicate::typed(&[Pending]), Charging.name()),
            )
            .and_then(|builder| {
                builder.event(EventBuilder::new("finalize").guarded(
                    StatePredicate::typed(&[Charging]),
                    Paid.name(),
                    Guard::new(|invoice: &Invoice| invoice.approved).with_note("invoice not approved"),
                ))
            })
            .and_then(|builder| {
                builder.event(
                    EventBuilder::new("void")
                        .transition(StatePredicate::Except(vec!["paid".to_string()]), Void.name()),
                )
            })
            .and_then(MachineBuilder::build)
            .expect("invoice machine is valid");

        MachineRegistry::single(machine)
    }

    fn status(&self, _attribute: &str) -> Option<String> {
        Some(self.status.clone())
    }

    fn set_status(&mut self, _attribute: &str, state: &str) {
        self.status = state.to_string();
    }

    fn staging(&self) -> &AuditStaging {
        &self.staging
    }

    fn staging_mut(&mut self) -> &mut AuditStaging {
        &mut self.staging
    }

    fn audit_logs(&self, association: &str) -> Option<&AuditLogs> {
        (association == "audit_logs").then_some(&self.audit_logs)
    }

    fn audit_logs_mut(&mut self, association: &str) -> Option<&mut AuditLogs> {
        (association == "audit_logs").then_some(&mut self.audit_logs)
    }
}

/// Entity with two machines, `m1` and `m2`, sharing the `go` event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub billing: String,
    pub route: String,
    #[serde(skip)]
    pub staging: AuditStaging,
    #[serde(skip)]
    pub audit_logs: AuditLogs,
}

impl Shipment {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            billing: "open".to_string(),
            route: "open".to_string(),
            staging: AuditStaging::default(),
            audit_logs: AuditLogs::default(),
        }
    }

    pub fn trail() -> AuditTrail<Shipment> {
        AuditTrail::builder()
            .schema(AuditSchema::conventional().column("machine_name", "varchar"))
            .build()
            .expect("shipment trail is valid")
    }
}

impl Auditable for Shipment {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn machines() -> MachineRegistry<Self> {
        let machine = |name: &str, attribute: &str| {
            MachineBuilder::new(name)
                .attribute(attribute)
                .states(["open", "closed"])
                .event(
                    EventBuilder::new("go")
                        .guarded(
                            StatePredicate::state("open"),
                            "closed",
                            Guard::with_args(|_: &Shipment, args| {
                                args.first().and_then(|v| v.as_bool()).unwrap_or(true)
                            })
                            .with_note("go was refused"),
                        ),
                )
                .and_then(MachineBuilder::build)
                .expect("shipment machine is valid")
        };

        MachineRegistry::new(vec![machine("m1", "billing"), machine("m2", "route")])
    }

    fn status(&self, attribute: &str) -> Option<String> {
        match attribute {
            "billing" => Some(self.billing.clone()),
            "route" => Some(self.route.clone()),
            _ => None,
        }
    }

    fn set_status(&mut self, attribute: &str, state: &str) {
        match attribute {
            "billing" => self.billing = state.to_string(),
            "route" => self.route = state.to_string(),
            _ => {}
        }
    }

    fn staging(&self) -> &AuditStaging {
        &self.staging
    }

    fn staging_mut(&mut self) -> &mut AuditStaging {
        &mut self.staging
    }

    fn audit_logs(&self, association: &str) -> Option<&AuditLogs> {
        (association == "audit_logs").then_some(&self.audit_logs)
    }

    fn audit_logs_mut(&mut self, association: &str) -> Option<&mut AuditLogs> {
        (association == "audit_logs").then_some(&mut self.audit_logs)
    }
}

/// Graph with edges `begin -> middle`, `middle -> end` and `any -> end`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub position: String,
    #[serde(skip)]
    pub staging: AuditStaging,
    #[serde(skip)]
    pub audit_logs: AuditLogs,
}

impl Waypoint {
    pub fn at(position: &str) -> Self {
        Self {
            id: "w-1".to_string(),
            position: position.to_string(),
            staging: AuditStaging::default(),
            audit_logs: AuditLogs::default(),
        }
    }
}

impl Auditable for Waypoint {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn machines() -> MachineRegistry<Self> {
        let machine = MachineBuilder::new("position")
            .states(["begin", "middle", "end"])
            .event(EventBuilder::new("move_begin").transition(StatePredicate::state("begin"), "middle"))
            .and_then(|b| {
                b.event(EventBuilder::new("move_middle").transition(StatePredicate::state("middle"), "end"))
            })
            .and_then(|b| b.event(EventBuilder::new("move_any_to_end").transition(StatePredicate::Any, "end")))
            .and_then(MachineBuilder::build)
            .expect("waypoint machine is valid");
        MachineRegistry::single(machine)
    }

    fn status(&self, _attribute: &str) -> Option<String> {
        Some(self.position.clone())
    }

    fn set_status(&mut self, _attribute: &str, state: &str) {
        self.position = state.to_string();
    }

    fn staging(&self) -> &AuditStaging {
        &self.staging
    }

    fn staging_mut(&mut self) -> &mut AuditStaging {
        &mut self.staging
    }

    fn audit_logs(&self, _association: &str) -> Option<&AuditLogs> {
        Some(&self.audit_logs)
    }

    fn audit_logs_mut(&mut self, _association: &str) -> Option<&mut AuditLogs> {
        Some(&mut self.audit_logs)
    }
}

/// A store holding `entity`.
pub fn store_with<E: Auditable>(entity: &E) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(entity).expect("fresh store accepts the entity");
    store
}

/// Commit the entity's current attributes outside of any processing.
pub fn persist<E: Auditable>(store: &MemoryStore, entity: &E) {
    let mut snapshot = store.begin().expect("snapshot opens");
    store
        .save_entity(&mut snapshot, entity)
        .expect("entity is stored");
    store.commit(snapshot).expect("snapshot commits");
}
