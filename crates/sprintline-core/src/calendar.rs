//! Working-day calendar.
//!
//! A date is a working day unless it falls on Saturday or Sunday or on one
//! of the public holidays of the configured [`Locale`]. Holiday lists are a
//! pure function of the year; the Easter-dependent feasts are kept apart in
//! [`movable_holidays`] so the fixed-date table never needs to change when
//! the movable computation does.

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Errors raised by working-day counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// `start` is after `end`.
    #[error("invalid range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl CalendarError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRange { .. } => ErrorCode::InvalidRange,
        }
    }
}

/// Public-holiday set used to decide working days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    /// Polish statutory holidays.
    #[default]
    Poland,
    /// Saturdays and Sundays only.
    WeekendsOnly,
}

impl Locale {
    /// All holidays observed in `year`, fixed and movable.
    #[must_use]
    pub fn holidays(self, year: i32) -> Vec<Holiday> {
        match self {
            Self::Poland => {
                let mut all = fixed_holidays(year);
                all.extend(movable_holidays(year));
                all.sort_by_key(|holiday| holiday.date);
                all
            }
            Self::WeekendsOnly => Vec::new(),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = crate::model::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poland" | "pl" => Ok(Self::Poland),
            "weekends-only" | "none" => Ok(Self::WeekendsOnly),
            _ => Err(crate::model::ParseEnumError {
                expected: "locale",
                got: s.to_string(),
            }),
        }
    }
}

/// A named public holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

const POLISH_FIXED: [(u32, u32, &str); 9] = [
    (1, 1, "New Year's Day"),
    (1, 6, "Epiphany"),
    (5, 1, "Labour Day"),
    (5, 3, "Constitution Day"),
    (8, 15, "Assumption of Mary"),
    (11, 1, "All Saints' Day"),
    (11, 11, "Independence Day"),
    (12, 25, "Christmas Day"),
    (12, 26, "Second Day of Christmas"),
];

/// Holidays that fall on the same month and day every year.
#[must_use]
pub fn fixed_holidays(year: i32) -> Vec<Holiday> {
    POLISH_FIXED
        .iter()
        .filter_map(|&(month, day, name)| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| Holiday { date, name })
        })
        .collect()
}

/// Holidays anchored on Easter Sunday for `year`.
#[must_use]
pub fn movable_holidays(year: i32) -> Vec<Holiday> {
    let Some(easter) = easter_sunday(year) else {
        return Vec::new();
    };

    [
        (0, "Easter Sunday"),
        (1, "Easter Monday"),
        (49, "Pentecost Sunday"),
        (60, "Corpus Christi"),
    ]
    .into_iter()
    .filter_map(|(offset, name)| {
        easter
            .checked_add_days(Days::new(offset))
            .map(|date| Holiday { date, name })
    })
    .collect()
}

/// Western (Gregorian) Easter Sunday, by the anonymous Gregorian algorithm.
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

/// Returns true for Saturday and Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Business-day predicate and counter for one [`Locale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingDayCalendar {
    locale: Locale,
}

impl WorkingDayCalendar {
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Returns true when `date` is neither a weekend day nor a holiday.
    #[must_use]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if is_weekend(date) {
            return false;
        }
        !self
            .locale
            .holidays(date.year())
            .iter()
            .any(|holiday| holiday.date == date)
    }

    /// Count working days in `[start, end]`, both ends inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidRange`] when `start > end`.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> Result<u32, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }

        let holidays: HashSet<NaiveDate> = (start.year()..=end.year())
            .flat_map(|year| self.locale.holidays(year))
            .map(|holiday| holiday.date)
            .collect();

        let count = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| !is_weekend(*day) && !holidays.contains(day))
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
