//! Read-side queries over the audit history and the transition graph.
//!
//! Nothing here fires events or writes to the store:
//!
//! - [`timestamps`]: when a succeeded transition matching a filter happened
//! - [`validator`]: whether each status attribute holds a declared state
//! - [`reachability`]: which events could fire from the current status

pub mod reachability;
pub mod timestamps;
pub mod validator;

pub use timestamps::{TimestampDefinition, TimestampFilter};
pub use validator::FieldError;
