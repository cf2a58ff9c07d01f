//! In-memory accumulation of audit messages before a transition commits.

use crate::columns::MessageStorage;
use crate::core::Messages;
use std::collections::BTreeMap;
use tracing::debug;

/// The write buffer for one machine's next audit entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedAudit {
    pub messages: Messages,
    pub reason: String,
}

impl StagedAudit {
    pub fn new(storage: MessageStorage) -> Self {
        Self {
            messages: storage.empty(),
            reason: String::new(),
        }
    }

    pub fn note(&mut self, message: &str) {
        self.messages.push(message);
    }
}

/// Staged audits of one entity, keyed by machine name.
///
/// Owned by the entity instance; never persisted directly.
#[derive(Clone, Debug, Default)]
pub struct AuditStaging {
    staged: BTreeMap<String, StagedAudit>,
}

impl AuditStaging {
    /// The staged audit for `machine`, created on first access.
    pub fn current(&mut self, machine: &str, storage: MessageStorage) -> &mut StagedAudit {
        self.staged
            .entry(machine.to_string())
            .or_insert_with(|| StagedAudit::new(storage))
    }

    /// Append a message and optionally replace the reason.
    pub fn audit(
        &mut self,
        machine: &str,
        storage: MessageStorage,
        message: &str,
        reason: Option<&str>,
    ) -> &StagedAudit {
        let staged = self.current(machine, storage);
        staged.note(message);
        if let Some(reason) = reason {
            staged.reason = reason.to_string();
        }
        debug!(machine, message, "staged audit message");
        staged
    }

    pub fn peek(&self, machine: &str) -> Option<&StagedAudit> {
        self.staged.get(machine)
    }

    /// Remove and return the staged audit, leaving nothing behind.
    pub fn take(&mut self, machine: &str, storage: MessageStorage) -> StagedAudit {
        self.staged
            .remove(machine)
            .unwrap_or_else(|| StagedAudit::new(storage))
    }

    pub fn clear(&mut self, machine: &str) {
        self.staged.remove(machine);
    }

    pub fn clear_all(&mut self) {
        self.staged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_memoized_until_cleared() {
        let mut staging = AuditStaging::default();
        staging.current("status", MessageStorage::ArrayBacked).reason = "manual".to_string();

        assert_eq!(
            staging.current("status", MessageStorage::ArrayBacked).reason,
            "manual"
        );

        staging.clear("status");
        assert!(staging.peek("status").is_none());
        assert_eq!(staging.current("status", MessageStorage::ArrayBacked).reason, "");
    }

    #[test]
    fn audit_appends_to_array_storage() {
        let mut staging = AuditStaging::default();
        staging.audit("status", MessageStorage::ArrayBacked, "a", None);
        let staged = staging.audit("status", MessageStorage::ArrayBacked, "b", None);

        assert_eq!(
            staged.messages,
            Messages::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn audit_joins_string_storage_with_newlines() {
        let mut staging = AuditStaging::default();
        staging.audit("status", MessageStorage::StringBacked, "a", None);
        let staged = staging.audit("status", MessageStorage::StringBacked, "b", None);

        assert_eq!(staged.messages, Messages::Text("a\nb".to_string()));
    }

    #[test]
    fn audit_overwrites_reason_only_when_given() {
        let mut staging = AuditStaging::default();
        staging.audit("status", MessageStorage::ArrayBacked, "a", Some("first"));
        let staged = staging.audit("status", MessageStorage::ArrayBacked, "b", None);
        assert_eq!(staged.reason, "first");

        let staged = staging.audit("status", MessageStorage::ArrayBacked, "c", Some("second"));
        assert_eq!(staged.reason, "second");
    }

    #[test]
    fn machines_stage_independently() {
        let mut staging = AuditStaging::default();
        staging.audit("payment", MessageStorage::ArrayBacked, "paid", None);

        assert!(staging.peek("shipping").is_none());
        let taken = staging.take("payment", MessageStorage::ArrayBacked);
        assert_eq!(taken.messages.last(), Some("paid"));
        assert!(staging.peek("payment").is_none());
    }
}
