//! Which events could fire from the current status, without firing them.
//!
//! Only branch source predicates are consulted. Guards may still reject an
//! event reported as reachable.

use crate::entity::Auditable;
use crate::error::AuditError;
use crate::trail::AuditTrail;

impl<E: Auditable> AuditTrail<E> {
    /// Whether any branch of `event` starts from the entity's current status.
    ///
    /// Without a machine name the machine declaring `event` is used.
    /// Unknown events are an argument error listing the legal ones.
    pub fn reachable(&self, entity: &E, event: &str, machine: Option<&str>) -> Result<bool, AuditError> {
        let machine = match machine {
            Some(name) => self.machines.resolve(Some(name))?,
            None => self.machines.resolve_for_event(event)?,
        };
        let status = entity.status(machine.attribute());
        Ok(machine.require_event(event)?.can_fire_from(status.as_deref()))
    }

    /// Names of every event reachable from the current status.
    pub fn available_events(&self, entity: &E, machine: Option<&str>) -> Result<Vec<String>, AuditError> {
        let machine = self.machines.resolve(machine)?;
        let status = entity.status(machine.attribute());
        Ok(machine
            .events()
            .iter()
            .filter(|event| event.can_fire_from(status.as_deref()))
            .map(|event| event.name().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AuditError;
    use crate::fixtures::{Order, Parcel};
    use crate::trail::AuditTrail;

    fn trail() -> AuditTrail<Order> {
        AuditTrail::builder().build().unwrap()
    }

    #[test]
    fn branch_from_current_state_is_reachable() {
        let order = Order::new("o-1", 10);

        assert!(trail().reachable(&order, "charge", None).unwrap());
        assert!(!trail().reachable(&order, "settle", None).unwrap());
    }

    #[test]
    fn except_predicate_reaches_from_other_states() {
        let mut order = Order::new("o-2", 10);
        assert!(trail().reachable(&order, "cancel", None).unwrap());

        order.status = "paid".to_string();
        assert!(!trail().reachable(&order, "cancel", None).unwrap());
    }

    #[test]
    fn unknown_event_lists_legal_events() {
        let order = Order::new("o-3", 10);

        let err = trail().reachable(&order, "teleport", None).unwrap_err();
        assert!(err.is_argument_error());
        assert!(err.to_string().contains("charge, settle, finalize, cancel"));
    }

    #[test]
    fn available_events_follow_status() {
        let mut order = Order::new("o-4", 10);
        assert_eq!(trail().available_events(&order, None).unwrap(), vec!["charge", "cancel"]);

        order.status = "charging".to_string();
        assert_eq!(
            trail().available_events(&order, None).unwrap(),
            vec!["settle", "finalize", "cancel"]
        );
    }

    #[test]
    fn shared_event_needs_a_machine() {
        let trail = Parcel::trail();
        let parcel = Parcel::new("p-1");

        let err = trail.reachable(&parcel, "advance", None).unwrap_err();
        assert!(matches!(err, AuditError::MachineRequired { .. }));

        assert!(trail.reachable(&parcel, "advance", Some("delivery")).unwrap());
        assert!(!trail.reachable(&parcel, "refund", None).unwrap());
    }
}
