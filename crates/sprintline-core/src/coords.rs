//! Date ↔ pixel mapping for the timeline surface.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, Months, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarError;
use crate::model::ParseEnumError;

/// Narrowest width any bar is drawn at, in pixels.
pub const MIN_BAR_WIDTH: f64 = 20.0;

/// Calendar granularity of the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
}

impl ZoomLevel {
    pub const ALL: [Self; 4] = [Self::Day, Self::Week, Self::Month, Self::Quarter];

    /// Horizontal density of the timeline body.
    #[must_use]
    pub const fn pixels_per_day(self) -> f64 {
        match self {
            Self::Day => 40.0,
            Self::Week => 20.0,
            Self::Month => 5.0,
            Self::Quarter => 2.0,
        }
    }

    /// Width of one calendar header segment.
    #[must_use]
    pub const fn header_width(self) -> f64 {
        match self {
            Self::Day => 40.0,
            Self::Week => 120.0,
            Self::Month => 150.0,
            Self::Quarter => 200.0,
        }
    }

    /// One step finer, saturating at [`ZoomLevel::Day`].
    #[must_use]
    pub const fn zoom_in(self) -> Self {
        match self {
            Self::Day | Self::Week => Self::Day,
            Self::Month => Self::Week,
            Self::Quarter => Self::Month,
        }
    }

    /// One step coarser, saturating at [`ZoomLevel::Quarter`].
    #[must_use]
    pub const fn zoom_out(self) -> Self {
        match self {
            Self::Day => Self::Week,
            Self::Week => Self::Month,
            Self::Month | Self::Quarter => Self::Quarter,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoomLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            _ => Err(ParseEnumError {
                expected: "zoom level",
                got: s.to_string(),
            }),
        }
    }
}

/// Inclusive date bounds of the rendered timeline. `start <= end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimelineWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimelineWindow {
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidRange`] when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Twelve whole months starting with the month containing `anchor`.
    #[must_use]
    pub fn twelve_months_from(anchor: NaiveDate) -> Self {
        let start = first_of_month(anchor);
        Self {
            start,
            end: last_of_month(add_months(start, 11)),
        }
    }

    /// Shift both bounds by `months`, keeping them month-aligned.
    #[must_use]
    pub fn shifted_by_months(self, months: i32) -> Self {
        Self {
            start: first_of_month(add_months(self.start, months)),
            end: last_of_month(add_months(first_of_month(self.end), months)),
        }
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// First day of the month containing `date`.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
#[must_use]
pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
        .unwrap_or(date)
}

/// Calendar-month arithmetic in either direction, clamping the day of month.
#[must_use]
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Signed day offset by whole days, saturating at the representable range.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Whole calendar days from `from` to `to`; negative when `to` precedes `from`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Maps dates to pixel offsets for one zoom level and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    zoom: ZoomLevel,
    window: TimelineWindow,
}

impl CoordinateMapper {
    #[must_use]
    pub const fn new(zoom: ZoomLevel, window: TimelineWindow) -> Self {
        Self { zoom, window }
    }

    #[must_use]
    pub const fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    #[must_use]
    pub const fn window(&self) -> TimelineWindow {
        self.window
    }

    /// Offset of `date` from the window start. Negative left of the window.
    #[must_use]
    pub fn date_to_x(&self, date: NaiveDate) -> f64 {
        days_between(self.window.start, date) as f64 * self.zoom.pixels_per_day()
    }

    /// Width covering `start..=end`, never narrower than [`MIN_BAR_WIDTH`].
    #[must_use]
    pub fn range_to_width(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        let days = days_between(start, end) + 1;
        (days as f64 * self.zoom.pixels_per_day()).max(MIN_BAR_WIDTH)
    }

    /// Date under pixel offset `x`, snapped to the nearest day.
    #[must_use]
    pub fn x_to_date(&self, x: f64) -> NaiveDate {
        let days = (x / self.zoom.pixels_per_day()).round();
        add_days(self.window.start, days as i64)
    }

    /// Width of the whole window body.
    #[must_use]
    pub fn total_width(&self) -> f64 {
        days_between(self.window.start, self.window.end) as f64 * self.zoom.pixels_per_day()
    }
}
