//! Error types for audit trail configuration, lookups and processing.

use crate::store::StoreError;
use thiserror::Error;

/// Errors raised by the audit trail engine.
///
/// Configuration errors surface from [`AuditTrailBuilder::build`] and are
/// fatal. Argument errors signal caller misuse. A guard rejecting an event is
/// not an error: only [`TransitionProcessor::must_process`] escalates it to
/// [`AuditError::FailedTransition`].
///
/// [`AuditTrailBuilder::build`]: crate::trail::AuditTrailBuilder::build
/// [`TransitionProcessor::must_process`]: crate::processor::TransitionProcessor::must_process
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Invalid audit configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown state machine '{name}'. Known machines: {known}")]
    UnknownMachine { name: String, known: String },

    #[error("Entity runs several state machines ({known}); a machine name is required")]
    MachineRequired { known: String },

    #[error("Event '{event}' does not exist on machine '{machine}'. Legal events: {legal}")]
    UnknownEvent {
        event: String,
        machine: String,
        legal: String,
    },

    #[error("Unknown timestamp '{0}'")]
    UnknownTimestamp(String),

    #[error("Target state not specified. Call .to(state) before checking")]
    MissingTargetState,

    #[error("Audit field '{0}' has no column mapping")]
    UnmappedField(String),

    #[error("Event '{event}' did not transition{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    FailedTransition {
        event: String,
        message: Option<String>,
    },

    #[error("A current actor is already set for this context")]
    CurrentActorAlreadySet,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuditError {
    /// Whether the error signals caller misuse rather than configuration or storage trouble.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMachine { .. }
                | Self::MachineRequired { .. }
                | Self::UnknownEvent { .. }
                | Self::UnknownTimestamp(_)
                | Self::MissingTargetState
                | Self::UnmappedField(_)
        )
    }
}
