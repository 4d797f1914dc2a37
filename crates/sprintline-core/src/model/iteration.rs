use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ModelError, ParseEnumError};

/// Lifecycle of an iteration. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationStatus {
    Planned,
    Active,
    Completed,
}

impl IterationStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `planned -> active`
    /// - `planned -> completed`
    /// - `active -> completed`
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTransition`] for no-op and backward moves.
    pub fn can_transition_to(self, target: Self) -> Result<(), ModelError> {
        if self == target {
            return Err(ModelError::InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        if target > self {
            Ok(())
        } else {
            Err(ModelError::InvalidTransition {
                from: self,
                to: target,
                reason: "iterations never move backward",
            })
        }
    }
}

/// A time-boxed period ("sprint") with inclusive start and end dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    pub id: String,
    pub name: String,
    pub status: IterationStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Iteration {
    /// Build a planned iteration, rejecting an end date before the start.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvertedIteration`] when `end < start`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ModelError> {
        let iteration = Self {
            id: id.into(),
            name: name.into(),
            status: IterationStatus::Planned,
            start_date,
            end_date,
            created_at: None,
            updated_at: None,
        };
        iteration.validate()?;
        Ok(iteration)
    }

    /// Check the `end >= start` invariant on a deserialized iteration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvertedIteration`] when the bounds are inverted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.end_date < self.start_date {
            return Err(ModelError::InvertedIteration {
                id: self.id.clone(),
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Move the iteration along its lifecycle.
    ///
    /// # Errors
    ///
    /// Propagates [`IterationStatus::can_transition_to`] failures.
    pub fn transition_to(&mut self, target: IterationStatus) -> Result<(), ModelError> {
        self.status.can_transition_to(target)?;
        self.status = target;
        Ok(())
    }

    /// Returns true when `date` falls inside the inclusive bounds.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// The first iteration currently in the `active` state.
#[must_use]
pub fn active_iteration(iterations: &[Iteration]) -> Option<&Iteration> {
    iterations
        .iter()
        .find(|iteration| iteration.status == IterationStatus::Active)
}

impl fmt::Display for IterationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IterationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "iteration status",
                got: s.to_string(),
            }),
        }
    }
}
