//! Iteration progress and completion ratios.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calendar::WorkingDayCalendar;
use crate::coords::days_between;
use crate::model::{Iteration, IterationStatus, ParseEnumError, Status, WorkItem};

/// How elapsed time inside an iteration is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// Only working days count toward elapsed time.
    #[default]
    WorkingDays,
    /// Every calendar day counts equally.
    Calendar,
}

impl Weighting {
    const fn as_str(self) -> &'static str {
        match self {
            Self::WorkingDays => "working-days",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weighting {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "working-days" | "working" | "workdays" => Ok(Self::WorkingDays),
            "calendar" => Ok(Self::Calendar),
            _ => Err(ParseEnumError {
                expected: "weighting",
                got: s.to_string(),
            }),
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Progress of `iteration` at `reference`, as a percentage in `[0, 100]`.
///
/// Before the start this is 0 and after the end 100, regardless of weighting.
#[must_use]
pub fn iteration_progress(
    iteration: &Iteration,
    reference: NaiveDate,
    weighting: Weighting,
    calendar: &WorkingDayCalendar,
) -> f64 {
    let (start, end) = (iteration.start_date, iteration.end_date);
    if reference < start {
        return 0.0;
    }
    if reference > end {
        return 100.0;
    }

    match weighting {
        Weighting::Calendar => {
            let total = days_between(start, end);
            if total == 0 {
                return 0.0;
            }
            clamp_percent(100.0 * days_between(start, reference) as f64 / total as f64)
        }
        Weighting::WorkingDays => {
            let counts = calendar.count_working_days(start, end).and_then(|total| {
                calendar
                    .count_working_days(start, reference)
                    .map(|elapsed| (elapsed, total))
            });
            match counts {
                Ok((_, 0)) => 0.0,
                Ok((elapsed, total)) => clamp_percent(100.0 * f64::from(elapsed) / f64::from(total)),
                Err(err) => {
                    warn!(iteration = %iteration.id, error = %err, "progress requested for invalid iteration");
                    0.0
                }
            }
        }
    }
}

/// Share of `items` in the `Done` state, as a percentage. Empty input is 0.
#[must_use]
pub fn task_completion_ratio<'a, I>(items: I) -> f64
where
    I: IntoIterator<Item = &'a WorkItem>,
{
    let (done, total) = items
        .into_iter()
        .fold((0_usize, 0_usize), |(done, total), item| {
            (done + usize::from(item.is_done()), total + 1)
        });
    if total == 0 {
        return 0.0;
    }
    clamp_percent(100.0 * done as f64 / total as f64)
}

/// Item counts per workflow state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub in_review: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a WorkItem>) -> Self {
        let mut counts = Self::default();
        for item in items {
            counts.total += 1;
            match item.status {
                Status::Todo => counts.todo += 1,
                Status::InProgress => counts.in_progress += 1,
                Status::InReview => counts.in_review += 1,
                Status::Done => counts.done += 1,
            }
        }
        counts
    }
}

/// Everything an iteration card shows about one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationSummary {
    pub id: String,
    pub name: String,
    pub status: IterationStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reference_date: NaiveDate,
    /// Progress under the requested weighting.
    pub progress: f64,
    pub weighting: Weighting,
    /// Calendar-weighted progress, shown alongside for comparison.
    pub elapsed_progress: f64,
    /// Whole days from the reference date to the end; negative once over.
    pub days_remaining: i64,
    pub working_days_total: u32,
    pub items: StatusCounts,
    pub completion: f64,
}

impl IterationSummary {
    /// Summarize `iteration` and the items assigned to it.
    #[must_use]
    pub fn build(
        iteration: &Iteration,
        items: &[WorkItem],
        reference: NaiveDate,
        weighting: Weighting,
        calendar: &WorkingDayCalendar,
    ) -> Self {
        let assigned: Vec<&WorkItem> = items
            .iter()
            .filter(|item| item.iteration_id.as_deref() == Some(iteration.id.as_str()))
            .collect();

        Self {
            id: iteration.id.clone(),
            name: iteration.name.clone(),
            status: iteration.status,
            start_date: iteration.start_date,
            end_date: iteration.end_date,
            reference_date: reference,
            progress: iteration_progress(iteration, reference, weighting, calendar),
            weighting,
            elapsed_progress: iteration_progress(iteration, reference, Weighting::Calendar, calendar),
            days_remaining: days_between(reference, iteration.end_date),
            working_days_total: calendar
                .count_working_days(iteration.start_date, iteration.end_date)
                .unwrap_or(0),
            items: StatusCounts::tally(assigned.iter().copied()),
            completion: task_completion_ratio(assigned.iter().copied()),
        }
    }
}
