//! Work items, iterations, and the errors raised while validating them.

pub mod item;
pub mod iteration;

use chrono::NaiveDate;

use crate::error::ErrorCode;
pub use item::{Dependency, DependencyKind, Kind, Priority, Status, WorkItem};
pub use iteration::{Iteration, IterationStatus, active_iteration};

/// Errors raised by model constructors and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An iteration whose end date precedes its start date.
    #[error("iteration '{id}' ends on {end} before it starts on {start}")]
    InvertedIteration {
        id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A lifecycle move the iteration rules forbid.
    #[error("cannot move iteration from {from} to {to}: {reason}")]
    InvalidTransition {
        from: IterationStatus,
        to: IterationStatus,
        reason: &'static str,
    },

    /// Unknown textual enum value.
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
}

impl ModelError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvertedIteration { .. } => ErrorCode::InvertedIteration,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::Parse(_) => ErrorCode::InvalidEnumValue,
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}
