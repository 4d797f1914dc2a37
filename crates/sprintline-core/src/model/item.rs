use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ParseEnumError;

/// The four workflow states, in board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl Status {
    pub const ALL: [Self; 4] = [Self::Todo, Self::InProgress, Self::InReview, Self::Done];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::InReview => "in-review",
            Self::Done => "done",
        }
    }

    /// Board column heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::InReview => "In Review",
            Self::Done => "Done",
        }
    }
}

/// Priority tier, `P0` being the most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
    P4,
    P5,
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
        }
    }
}

/// Hierarchy level of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Epic,
    Story,
    Task,
    SubTask,
}

impl Kind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Task => "task",
            Self::SubTask => "sub-task",
        }
    }
}

/// A trackable unit of work with an optional scheduled date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    pub status: Status,
    pub priority: Priority,
    pub assignee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    /// Reported completion, 0–100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub is_blocked: bool,
    pub has_risk: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for WorkItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: None,
            kind: None,
            status: Status::Todo,
            priority: Priority::default(),
            assignee: String::new(),
            iteration_id: None,
            parent_id: None,
            start_date: None,
            delivery_date: None,
            progress: None,
            is_blocked: false,
            has_risk: false,
            labels: Vec::new(),
            team: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl WorkItem {
    /// Create an undated item with the given id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper used by hosts and tests.
    #[must_use]
    pub fn with_dates(mut self, start: Option<NaiveDate>, delivery: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.delivery_date = delivery;
        self
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.status, Status::Done)
    }

    /// Returns true when either schedule date is present.
    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        self.start_date.is_some() || self.delivery_date.is_some()
    }
}

/// Scheduling link between two items. Carried in data, never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub from_item_id: String,
    pub to_item_id: String,
    pub kind: DependencyKind,
    /// Lag in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag: Option<i32>,
}

/// Finish/start relationship of a [`Dependency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyKind {
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace([' ', '_'], "-")
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "todo" => Ok(Self::Todo),
            "in-progress" | "doing" => Ok(Self::InProgress),
            "in-review" | "review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "p0" => Ok(Self::P0),
            "p1" => Ok(Self::P1),
            "p2" => Ok(Self::P2),
            "p3" => Ok(Self::P3),
            "p4" => Ok(Self::P4),
            "p5" => Ok(Self::P5),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Kind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "epic" => Ok(Self::Epic),
            "story" => Ok(Self::Story),
            "task" => Ok(Self::Task),
            "sub-task" | "subtask" => Ok(Self::SubTask),
            _ => Err(ParseEnumError {
                expected: "kind",
                got: s.to_string(),
            }),
        }
    }
}
