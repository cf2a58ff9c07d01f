//! State naming and branch source predicates.
//!
//! Machine descriptors store canonical state names as strings, which is also
//! how status attributes are persisted. Typed state enums plug in through the
//! [`State`] trait.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for typed state enums.
///
/// Implementors provide the canonical name that is written to the status
/// attribute and to the `from_state`/`to_state` audit columns.
///
/// # Example
///
/// ```rust
/// use state_audit::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum OrderState {
///     Pending,
///     Paid,
///     Cancelled,
/// }
///
/// impl State for OrderState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "pending",
///             Self::Paid => "paid",
///             Self::Cancelled => "cancelled",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Paid | Self::Cancelled)
///     }
/// }
///
/// assert_eq!(OrderState::Paid.name(), "paid");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Canonical name stored in status attributes and audit rows.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    fn is_error(&self) -> bool {
        false
    }
}

/// Which current states a branch may fire from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatePredicate {
    /// Matches every state, including an unset status.
    Any,
    /// Matches the listed states only.
    Is(Vec<String>),
    /// Matches every set status except the listed states.
    Except(Vec<String>),
}

impl StatePredicate {
    /// Predicate matching exactly one state.
    pub fn state(name: impl Into<String>) -> Self {
        Self::Is(vec![name.into()])
    }

    /// Predicate matching any of the given states.
    pub fn any_of<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::Is(names.into_iter().map(Into::into).collect())
    }

    /// Predicate matching any of the given typed states.
    pub fn typed<S: State>(states: &[S]) -> Self {
        Self::Is(states.iter().map(|s| s.name().to_string()).collect())
    }

    /// Test the predicate against a status value. `None` is an unset status.
    pub fn matches(&self, status: Option<&str>) -> bool {
        match (self, status) {
            (Self::Any, _) => true,
            (_, None) => false,
            (Self::Is(names), Some(status)) => names.iter().any(|n| n == status),
            (Self::Except(names), Some(status)) => !names.iter().any(|n| n == status),
        }
    }
}
