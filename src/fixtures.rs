//! Entities shared by the unit tests.

use crate::columns::AuditSchema;
use crate::core::{Guard, StatePredicate};
use crate::entity::Auditable;
use crate::machine::{EventBuilder, MachineBuilder, MachineDescriptor, MachineRegistry};
use crate::repository::AuditLogs;
use crate::staging::AuditStaging;
use crate::trail::AuditTrail;
use serde::{Deserialize, Serialize};

/// Single-machine entity: `pending -> charging -> paid`, or cancelled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Order {
    pub(crate) id: String,
    pub(crate) status: String,
    pub(crate) total: u64,
    pub(crate) captured: bool,
    #[serde(skip)]
    pub(crate) staging: AuditStaging,
    #[serde(skip)]
    pub(crate) audit_logs: AuditLogs,
}

impl Order {
    pub(crate) fn new(id: &str, total: u64) -> Self {
        Self {
            id: id.to_string(),
            status: "pending".to_string(),
            total,
            captured: false,
            staging: AuditStaging::default(),
            audit_logs: AuditLogs::default(),
        }
    }
}

fn order_machine() -> Result<MachineDescriptor<Order>, crate::error::AuditError> {
    MachineBuilder::new("status")
        .states(["pending", "charging", "paid", "cancelled"])
        .event(
            EventBuilder::new("charge")
                .guarded(
                    StatePredicate::state("pending"),
                    "paid",
                    Guard::new(|order: &Order| order.total == 0),
                )
                .transition(StatePredicate::state("pending"), "charging"),
        )?
        .event(EventBuilder::new("settle").guarded(
            StatePredicate::state("charging"),
            "paid",
            Guard::new(|order: &Order| order.captured).with_note("payment not captured"),
        ))?
        .event(EventBuilder::new("finalize").transition(StatePredicate::state("charging"), "paid"))?
        .event(EventBuilder::new("cancel").transition(
            StatePredicate::Except(vec!["paid".to_string()]),
            "cancelled",
        ))?
        .build()
}

impl Auditable for Order {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn machines() -> MachineRegistry<Self> {
        MachineRegistry::single(order_machine().expect("order machine is valid"))
    }

    fn status(&self, attribute: &str) -> Option<String> {
        (attribute == "status").then(|| self.status.clone())
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

/// Entity running two machines that share the `advance` event and state names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Parcel {
    pub(crate) id: String,
    pub(crate) payment_status: String,
    pub(crate) delivery_status: String,
    #[serde(skip)]
    pub(crate) staging: AuditStaging,
    #[serde(skip)]
    pub(crate) audit_logs: AuditLogs,
}

impl Parcel {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            payment_status: "new".to_string(),
            delivery_status: "new".to_string(),
            staging: AuditStaging::default(),
            audit_logs: AuditLogs::default(),
        }
    }

    pub(crate) fn schema() -> AuditSchema {
        AuditSchema::conventional().column("machine_name", "varchar")
    }

    pub(crate) fn trail() -> AuditTrail<Parcel> {
        AuditTrail::builder()
            .schema(Self::schema())
            .build()
            .expect("parcel trail is valid")
    }
}

fn advance(builder: MachineBuilder<Parcel>) -> Result<MachineBuilder<Parcel>, crate::error::AuditError> {
    builder.event(
        EventBuilder::new("advance")
            .transition(StatePredicate::state("new"), "active")
            .transition(StatePredicate::state("active"), "done"),
    )
}

impl Auditable for Parcel {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn machines() -> MachineRegistry<Self> {
        let payment = advance(
            MachineBuilder::new("payment")
                .attribute("payment_status")
                .states(["new", "active", "done"]),
        )
        .and_then(|builder| {
            builder.event(EventBuilder::new("refund").transition(StatePredicate::state("done"), "new"))
        })
        .and_then(MachineBuilder::build)
        .expect("payment machine is valid");

        let delivery = advance(
            MachineBuilder::new("delivery")
                .attribute("delivery_status")
                .states(["new", "active", "done", "lost"]),
        )
        .and_then(|builder| {
            builder.event(EventBuilder::new("lose").transition(
                StatePredicate::Except(vec!["done".to_string()]),
                "lost",
            ))
        })
        .and_then(MachineBuilder::build)
        .expect("delivery machine is valid");

        MachineRegistry::new(vec![payment, delivery])
    }

    fn status(&self, attribute: &str) -> Option<String> {
        match attribute {
            "payment_status" => Some(self.payment_status.clone()),
            "delivery_status" => Some(self.delivery_status.clone()),
            _ => None,
        }
    }

    fn set_status(&mut self, attribute: &str, state: &str) {
        match attribute {
            "payment_status" => self.payment_status = state.to_string(),
            "delivery_status" => self.delivery_status = state.to_string(),
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
