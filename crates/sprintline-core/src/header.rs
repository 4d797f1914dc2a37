//! Calendar header segments drawn above the timeline body.
//!
//! One segment per day, week, month, or quarter depending on the zoom level.
//! Segments cover the whole window; the first one may begin before the
//! window start when the period containing it does (a week that started on
//! the previous Sunday, the quarter the window's first month belongs to).

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::calendar::is_weekend;
use crate::coords::{TimelineWindow, ZoomLevel, add_days, add_months, first_of_month, last_of_month};

/// One clickable cell of the calendar header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderSegment {
    /// First day of the period; becomes the focus when the segment is clicked.
    pub anchor: NaiveDate,
    /// Last day of the period.
    pub last: NaiveDate,
    pub label: String,
    pub caption: String,
    pub width: f64,
    /// The period contains today.
    pub is_current: bool,
    /// The period contains the focused date.
    pub is_focused: bool,
    /// Only ever set for day segments.
    pub is_weekend: bool,
}

impl HeaderSegment {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.anchor <= date && date <= self.last
    }

    /// Label and caption on one line, e.g. `"8 Mon"` or `"Q1 2024"`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} {}", self.label, self.caption)
    }
}

/// Inputs for one header pass.
#[derive(Debug, Clone, Copy)]
pub struct HeaderRequest {
    pub zoom: ZoomLevel,
    pub window: TimelineWindow,
    pub today: NaiveDate,
    pub focused: Option<NaiveDate>,
    pub week_start: Weekday,
}

/// First day of the week containing `date`.
#[must_use]
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let day_idx = i64::from(date.weekday().num_days_from_monday());
    let start_idx = i64::from(week_start.num_days_from_monday());
    add_days(date, -((7 + day_idx - start_idx) % 7))
}

/// First day of the quarter containing `date`.
#[must_use]
pub fn start_of_quarter(date: NaiveDate) -> NaiveDate {
    let month0 = date.month0() - date.month0() % 3;
    NaiveDate::from_ymd_opt(date.year(), month0 + 1, 1).unwrap_or(date)
}

/// Quarter number, 1 through 4.
#[must_use]
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

fn period_start(zoom: ZoomLevel, date: NaiveDate, week_start: Weekday) -> NaiveDate {
    match zoom {
        ZoomLevel::Day => date,
        ZoomLevel::Week => start_of_week(date, week_start),
        ZoomLevel::Month => first_of_month(date),
        ZoomLevel::Quarter => start_of_quarter(date),
    }
}

fn period_last(zoom: ZoomLevel, anchor: NaiveDate) -> NaiveDate {
    match zoom {
        ZoomLevel::Day => anchor,
        ZoomLevel::Week => add_days(anchor, 6),
        ZoomLevel::Month => last_of_month(anchor),
        ZoomLevel::Quarter => last_of_month(add_months(anchor, 2)),
    }
}

fn labels(zoom: ZoomLevel, anchor: NaiveDate, last: NaiveDate) -> (String, String) {
    match zoom {
        ZoomLevel::Day => (anchor.day().to_string(), anchor.format("%a").to_string()),
        ZoomLevel::Week => (
            format!("{}-{}", anchor.day(), last.day()),
            anchor.format("%b").to_string(),
        ),
        ZoomLevel::Month => (anchor.format("%B").to_string(), anchor.year().to_string()),
        ZoomLevel::Quarter => (format!("Q{}", quarter_of(anchor)), anchor.year().to_string()),
    }
}

/// Build the ordered header segments for `request`.
#[must_use]
pub fn generate_headers(request: &HeaderRequest) -> Vec<HeaderSegment> {
    let zoom = request.zoom;
    let end = request.window.end();
    let mut segments = Vec::new();
    let mut anchor = period_start(zoom, request.window.start(), request.week_start);

    while anchor <= end {
        let last = period_last(zoom, anchor);
        let (label, caption) = labels(zoom, anchor, last);
        let contains = |date: NaiveDate| anchor <= date && date <= last;

        segments.push(HeaderSegment {
            anchor,
            last,
            label,
            caption,
            width: zoom.header_width(),
            is_current: contains(request.today),
            is_focused: request.focused.is_some_and(contains),
            is_weekend: zoom == ZoomLevel::Day && is_weekend(anchor),
        });

        let next = add_days(last, 1);
        if next <= anchor {
            break;
        }
        anchor = next;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request(zoom: ZoomLevel) -> HeaderRequest {
        HeaderRequest {
            zoom,
            window: TimelineWindow::twelve_months_from(d(2024, 3, 1)),
            today: d(2024, 3, 13),
            focused: None,
            week_start: Weekday::Sun,
        }
    }

    #[test]
    fn day_headers_cover_every_day() {
        let headers = generate_headers(&request(ZoomLevel::Day));
        assert_eq!(headers.len(), 365);
        assert_eq!(headers[0].label, "1");
        assert_eq!(headers[0].caption, "Fri");
        assert!(headers[1].is_weekend);
        assert!(headers.iter().all(|h| (h.width - 40.0).abs() < f64::EPSILON));
        assert_eq!(headers.iter().filter(|h| h.is_current).count(), 1);
        assert_eq!(headers[12].anchor, d(2024, 3, 13));
        assert!(headers[12].is_current);
    }

    #[test]
    fn week_headers_start_before_window() {
        let headers = generate_headers(&request(ZoomLevel::Week));
        // 2024-03-01 is a Friday; its Sunday-started week began Feb 25.
        assert_eq!(headers[0].anchor, d(2024, 2, 25));
        assert_eq!(headers[0].label, "25-2");
        assert_eq!(headers[0].caption, "Feb");
        assert!(headers.last().unwrap().anchor <= d(2025, 2, 28));
        assert!(headers.last().unwrap().last >= d(2025, 2, 28));
        assert!((headers[0].width - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn monday_week_start_is_honored() {
        let mut req = request(ZoomLevel::Week);
        req.week_start = Weekday::Mon;
        let headers = generate_headers(&req);
        assert_eq!(headers[0].anchor, d(2024, 2, 26));
    }

    #[test]
    fn month_headers_name_month_and_year() {
        let headers = generate_headers(&request(ZoomLevel::Month));
        assert_eq!(headers.len(), 12);
        assert_eq!(headers[0].label, "March");
        assert_eq!(headers[0].caption, "2024");
        assert_eq!(headers[11].label, "February");
        assert_eq!(headers[11].caption, "2025");
        assert!(headers[0].is_current);
        assert!(!headers[1].is_current);
    }

    #[test]
    fn quarter_headers_align_to_quarter_start() {
        let headers = generate_headers(&request(ZoomLevel::Quarter));
        assert_eq!(headers[0].anchor, d(2024, 1, 1));
        assert_eq!(headers[0].title(), "Q1 2024");
        assert_eq!(headers.len(), 5);
        assert_eq!(headers[4].title(), "Q1 2025");
        assert!((headers[0].width - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn focused_period_is_flagged() {
        let mut req = request(ZoomLevel::Month);
        req.focused = Some(d(2024, 7, 19));
        let headers = generate_headers(&req);
        let focused: Vec<_> = headers.iter().filter(|h| h.is_focused).collect();
        assert_eq!(focused.len(), 1);
        assert_eq!(focused[0].label, "July");
        assert!(focused[0].contains(d(2024, 7, 19)));
    }

    #[test]
    fn quarter_numbers() {
        assert_eq!(quarter_of(d(2024, 1, 31)), 1);
        assert_eq!(quarter_of(d(2024, 6, 30)), 2);
        assert_eq!(quarter_of(d(2024, 10, 1)), 4);
        assert_eq!(start_of_quarter(d(2024, 8, 20)), d(2024, 7, 1));
    }
}
