//! Timeline orchestration.
//!
//! [`TimelineEngine`] holds the view state a host keeps between events (zoom,
//! focused date, navigated window) and the [`InteractionController`]. Hosts
//! feed it events, then call [`TimelineEngine::recompute`] with the current
//! items to get a fresh [`TimelineView`]. Pointer coordinates always refer to
//! the window of the last recompute, which is the one on screen.

use std::collections::HashSet;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{Locale, WorkingDayCalendar};
use crate::coords::{CoordinateMapper, TimelineWindow, ZoomLevel};
use crate::header::{HeaderRequest, HeaderSegment, generate_headers};
use crate::interaction::{
    Edge, Gesture, GestureContext, HANDLE_WIDTH, InteractionController, PointerTarget,
    TimelineHost, resolved_end, resolved_start,
};
use crate::model::{Iteration, Status, WorkItem};
use crate::progress::{IterationSummary, Weighting, iteration_progress};

/// Months a single navigation step moves the window.
pub const NAVIGATION_STRIDE_MONTHS: i32 = 6;

/// Direction of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Back,
    Forward,
}

/// Engine settings a host usually reads from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub zoom: ZoomLevel,
    pub week_start: Weekday,
    pub locale: Locale,
    pub weighting: Weighting,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            zoom: ZoomLevel::default(),
            week_start: Weekday::Sun,
            locale: Locale::default(),
            weighting: Weighting::default(),
        }
    }
}

/// Visual emphasis of a bar, strongest condition first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarTone {
    Blocked,
    AtRisk,
    Done,
    Active,
    Neutral,
}

impl BarTone {
    #[must_use]
    pub const fn of(item: &WorkItem) -> Self {
        if item.is_blocked {
            Self::Blocked
        } else if item.has_risk {
            Self::AtRisk
        } else {
            match item.status {
                Status::Done => Self::Done,
                Status::InProgress => Self::Active,
                Status::Todo | Status::InReview => Self::Neutral,
            }
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::AtRisk => "at-risk",
            Self::Done => "done",
            Self::Active => "active",
            Self::Neutral => "neutral",
        }
    }
}

/// One rendered bar. Derived on every recompute, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub item_id: String,
    pub title: String,
    pub row: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub x: f64,
    pub width: f64,
    pub is_selected: bool,
    /// A drag or resize is in progress on this bar.
    pub is_active: bool,
    pub tone: BarTone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl TimelineBar {
    /// Classify a pointer at `x` against this bar's body and edge handles.
    #[must_use]
    pub fn hit_test(&self, x: f64) -> Option<PointerTarget> {
        let right = self.x + self.width;
        if x < self.x || x > right {
            return None;
        }
        if x - self.x <= HANDLE_WIDTH {
            Some(PointerTarget::Handle(Edge::Start))
        } else if right - x <= HANDLE_WIDTH {
            Some(PointerTarget::Handle(Edge::End))
        } else {
            Some(PointerTarget::Body)
        }
    }
}

/// Everything a host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineView {
    pub window: TimelineWindow,
    pub zoom: ZoomLevel,
    pub total_width: f64,
    pub today_x: f64,
    /// Marker line of an active resize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_x: Option<f64>,
    pub headers: Vec<HeaderSegment>,
    pub bars: Vec<TimelineBar>,
}

impl TimelineView {
    /// Header segment under offset `x`, measured along the header strip.
    #[must_use]
    pub fn header_at(&self, x: f64) -> Option<&HeaderSegment> {
        if x < 0.0 {
            return None;
        }
        let mut left = 0.0;
        for segment in &self.headers {
            if x < left + segment.width {
                return Some(segment);
            }
            left += segment.width;
        }
        None
    }

    /// Bar in `row` and the part of it under `x`.
    #[must_use]
    pub fn hit_test(&self, row: usize, x: f64) -> Option<(&TimelineBar, PointerTarget)> {
        let bar = self.bars.iter().find(|bar| bar.row == row)?;
        bar.hit_test(x).map(|target| (bar, target))
    }
}

/// Owned timeline state plus the gesture controller.
#[derive(Debug)]
pub struct TimelineEngine {
    options: EngineOptions,
    calendar: WorkingDayCalendar,
    today: NaiveDate,
    zoom: ZoomLevel,
    focused: Option<NaiveDate>,
    navigated: Option<TimelineWindow>,
    window: TimelineWindow,
    controller: InteractionController,
}

impl TimelineEngine {
    #[must_use]
    pub fn new(today: NaiveDate, options: EngineOptions) -> Self {
        Self {
            options,
            calendar: WorkingDayCalendar::new(options.locale),
            today,
            zoom: options.zoom,
            focused: None,
            navigated: None,
            window: TimelineWindow::twelve_months_from(today),
            controller: InteractionController::new(),
        }
    }

    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Move "today" forward, e.g. when a long-running host crosses midnight.
    pub const fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    #[must_use]
    pub const fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    #[must_use]
    pub const fn focused(&self) -> Option<NaiveDate> {
        self.focused
    }

    /// Window resolved by the last recompute.
    #[must_use]
    pub const fn window(&self) -> TimelineWindow {
        self.window
    }

    #[must_use]
    pub const fn calendar(&self) -> &WorkingDayCalendar {
        &self.calendar
    }

    #[must_use]
    pub const fn controller(&self) -> &InteractionController {
        &self.controller
    }

    #[must_use]
    pub const fn selection(&self) -> &HashSet<String> {
        self.controller.selection()
    }

    #[must_use]
    pub const fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.zoom, self.window)
    }

    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        debug!(from = %self.zoom, to = %zoom, "zoom changed");
        self.zoom = zoom;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom.zoom_in());
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom.zoom_out());
    }

    /// Shift the visible window by [`NAVIGATION_STRIDE_MONTHS`]. Clears focus.
    pub fn navigate(&mut self, items: &[WorkItem], direction: Direction) {
        let months = match direction {
            Direction::Back => -NAVIGATION_STRIDE_MONTHS,
            Direction::Forward => NAVIGATION_STRIDE_MONTHS,
        };
        self.navigate_months(items, months);
    }

    /// Shift the window `items` currently resolve to by `months`. Clears focus.
    pub fn navigate_months(&mut self, items: &[WorkItem], months: i32) {
        let next = self.resolve_window(items).shifted_by_months(months);
        debug!(months, start = %next.start(), end = %next.end(), "navigated");
        self.navigated = Some(next);
        self.focused = None;
    }

    pub fn focus(&mut self, date: NaiveDate) {
        debug!(%date, "focus set");
        self.focused = Some(date);
    }

    /// Focus the period a header segment stands for.
    pub fn focus_segment(&mut self, segment: &HeaderSegment) {
        self.focus(segment.anchor);
    }

    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    /// Drop focus and navigation; the window follows the data again.
    pub fn reset(&mut self) {
        debug!("view reset");
        self.focused = None;
        self.navigated = None;
    }

    /// Window for `items` under the current focus and navigation state.
    #[must_use]
    pub fn resolve_window(&self, items: &[WorkItem]) -> TimelineWindow {
        if let Some(focused) = self.focused {
            return TimelineWindow::twelve_months_from(focused);
        }
        if let Some(navigated) = self.navigated {
            return navigated;
        }
        let earliest = items
            .iter()
            .flat_map(|item| [item.start_date, item.delivery_date])
            .flatten()
            .min()
            .unwrap_or(self.today);
        TimelineWindow::twelve_months_from(earliest)
    }

    /// Resolve the window and derive headers and bars for `items`.
    pub fn recompute(&mut self, items: &[WorkItem]) -> TimelineView {
        let window = self.resolve_window(items);
        if window != self.window {
            debug!(start = %window.start(), end = %window.end(), "window resolved");
        }
        self.window = window;
        let mapper = self.mapper();

        let headers = generate_headers(&HeaderRequest {
            zoom: self.zoom,
            window,
            today: self.today,
            focused: self.focused,
            week_start: self.options.week_start,
        });

        let active = self.controller.gesture().item_id();
        let bars = items
            .iter()
            .enumerate()
            .map(|(row, item)| {
                let start = resolved_start(item, self.today);
                let end = resolved_end(item, self.today);
                TimelineBar {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    row,
                    start,
                    end,
                    x: mapper.date_to_x(start),
                    width: mapper.range_to_width(start, end),
                    is_selected: self.controller.is_selected(&item.id),
                    is_active: active == Some(item.id.as_str()),
                    tone: BarTone::of(item),
                    progress: item.progress.map(|p| p.min(100)),
                }
            })
            .collect();

        TimelineView {
            window,
            zoom: self.zoom,
            total_width: mapper.total_width(),
            today_x: mapper.date_to_x(self.today),
            preview_x: self.controller.resize_preview().map(|date| mapper.date_to_x(date)),
            headers,
            bars,
        }
    }

    fn context<'a>(&self, items: &'a [WorkItem]) -> GestureContext<'a> {
        GestureContext {
            mapper: self.mapper(),
            today: self.today,
            items,
        }
    }

    pub fn pointer_down(
        &mut self,
        items: &[WorkItem],
        item_id: &str,
        target: PointerTarget,
        x: f64,
        toggle: bool,
        host: &mut impl TimelineHost,
    ) {
        let ctx = self.context(items);
        self.controller.pointer_down(item_id, target, x, toggle, &ctx, host);
    }

    pub fn pointer_move(&mut self, items: &[WorkItem], x: f64, host: &mut impl TimelineHost) {
        let ctx = self.context(items);
        self.controller.pointer_move(x, &ctx, host);
    }

    pub fn pointer_up(&mut self, items: &[WorkItem], host: &mut impl TimelineHost) {
        let ctx = self.context(items);
        self.controller.pointer_up(&ctx, host);
    }

    pub fn pointer_leave(&mut self, host: &mut impl TimelineHost) {
        self.controller.pointer_leave(host);
    }

    pub fn capture_lost(&mut self, host: &mut impl TimelineHost) {
        self.controller.capture_lost(host);
    }

    pub fn click(&mut self, item_id: &str, toggle: bool) {
        self.controller.click(item_id, toggle);
    }

    pub fn clear_selection(&mut self) {
        self.controller.clear_selection();
    }

    /// True while a drag or resize is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self.controller.gesture(), Gesture::Idle)
    }

    /// Progress of `iteration` at `reference` under the configured weighting.
    #[must_use]
    pub fn iteration_progress(&self, iteration: &Iteration, reference: NaiveDate) -> f64 {
        iteration_progress(iteration, reference, self.options.weighting, &self.calendar)
    }

    #[must_use]
    pub fn summarize(&self, iteration: &Iteration, items: &[WorkItem], reference: NaiveDate) -> IterationSummary {
        IterationSummary::build(iteration, items, reference, self.options.weighting, &self.calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[derive(Default)]
    struct Board {
        items: Vec<WorkItem>,
    }

    impl TimelineHost for Board {
        fn commit_item_update(&mut self, item: WorkItem) {
            if let Some(slot) = self.items.iter_mut().find(|i| i.id == item.id) {
                *slot = item;
            }
        }
    }

    fn engine() -> TimelineEngine {
        TimelineEngine::new(d(2024, 5, 14), EngineOptions::default())
    }

    #[test]
    fn window_follows_earliest_date() {
        let mut engine = engine();
        let items = vec![
            WorkItem::new("a", "A").with_dates(Some(d(2024, 6, 3)), None),
            WorkItem::new("b", "B").with_dates(None, Some(d(2024, 2, 17))),
        ];
        let view = engine.recompute(&items);
        assert_eq!(view.window.start(), d(2024, 2, 1));
        assert_eq!(view.window.end(), d(2025, 1, 31));
    }

    #[test]
    fn window_without_dates_anchors_on_today() {
        let mut engine = engine();
        let view = engine.recompute(&[WorkItem::new("a", "A")]);
        assert_eq!(view.window.start(), d(2024, 5, 1));
        assert_eq!(view.window.end(), d(2025, 4, 30));
    }

    #[test]
    fn focus_beats_navigation_and_navigation_clears_focus() {
        let mut engine = engine();
        let items = [WorkItem::new("a", "A")];
        engine.recompute(&items);

        engine.navigate(&items, Direction::Forward);
        assert_eq!(engine.recompute(&items).window.start(), d(2024, 11, 1));

        engine.focus(d(2025, 8, 20));
        assert_eq!(engine.recompute(&items).window.start(), d(2025, 8, 1));

        engine.navigate(&items, Direction::Back);
        assert_eq!(engine.focused(), None);
        assert_eq!(engine.recompute(&items).window.start(), d(2025, 2, 1));

        engine.reset();
        assert_eq!(engine.recompute(&items).window.start(), d(2024, 5, 1));
    }

    #[test]
    fn navigation_starts_from_the_window_items_resolve_to() {
        let mut engine = engine();
        let items =
            [WorkItem::new("a", "A").with_dates(Some(d(2023, 1, 10)), Some(d(2023, 1, 20)))];

        engine.navigate(&items, Direction::Forward);
        assert_eq!(engine.recompute(&items).window.start(), d(2023, 7, 1));

        engine.focus(d(2025, 8, 20));
        engine.navigate(&items, Direction::Back);
        assert_eq!(engine.recompute(&items).window.start(), d(2025, 2, 1));
    }

    #[test]
    fn clicking_a_header_focuses_it() {
        let mut engine = engine();
        let view = engine.recompute(&[]);
        let july = view.headers.iter().find(|h| h.label == "July").unwrap().clone();
        engine.focus_segment(&july);
        let view = engine.recompute(&[]);
        assert_eq!(view.window.start(), d(2024, 7, 1));
        assert!(view.headers[0].is_focused);
    }

    #[test]
    fn header_at_walks_segment_widths() {
        let mut engine = engine();
        let view = engine.recompute(&[]);
        assert_eq!(view.header_at(10.0).map(|h| h.label.as_str()), Some("May"));
        assert_eq!(view.header_at(160.0).map(|h| h.label.as_str()), Some("June"));
        assert!(view.header_at(-1.0).is_none());
        assert!(view.header_at(1e9).is_none());
    }

    #[test]
    fn undated_bar_spans_a_week_from_today() {
        let mut engine = engine();
        for zoom in ZoomLevel::ALL {
            engine.set_zoom(zoom);
            let view = engine.recompute(&[WorkItem::new("a", "A")]);
            let bar = &view.bars[0];
            assert_eq!(bar.start, d(2024, 5, 14));
            assert_eq!(bar.end, d(2024, 5, 21));
            assert!(bar.width >= 20.0);
        }
    }

    #[test]
    fn bar_flags_reflect_selection_and_gesture() {
        let mut engine = engine();
        let mut board = Board {
            items: vec![
                WorkItem::new("a", "A").with_dates(Some(d(2024, 5, 1)), Some(d(2024, 5, 10))),
                WorkItem::new("b", "B").with_dates(Some(d(2024, 5, 3)), Some(d(2024, 5, 4))),
            ],
        };
        let items = board.items.clone();
        engine.recompute(&items);
        engine.pointer_down(&items, "a", PointerTarget::Body, 20.0, false, &mut board);

        let view = engine.recompute(&board.items);
        assert!(view.bars[0].is_selected && view.bars[0].is_active);
        assert!(!view.bars[1].is_selected && !view.bars[1].is_active);
        assert!(engine.is_busy());

        engine.pointer_up(&board.items.clone(), &mut board);
        assert!(!engine.is_busy());
    }

    #[test]
    fn drag_through_engine_updates_host() {
        let mut engine = engine();
        engine.set_zoom(ZoomLevel::Day);
        let mut board = Board {
            items: vec![WorkItem::new("a", "A").with_dates(Some(d(2024, 5, 1)), Some(d(2024, 5, 3)))],
        };
        engine.recompute(&board.items);

        let snapshot = board.items.clone();
        engine.pointer_down(&snapshot, "a", PointerTarget::Body, 10.0, false, &mut board);
        for x in [50.0, 90.0, 130.0] {
            let snapshot = board.items.clone();
            engine.pointer_move(&snapshot, x, &mut board);
        }
        let snapshot = board.items.clone();
        engine.pointer_up(&snapshot, &mut board);

        assert_eq!(board.items[0].start_date, Some(d(2024, 5, 4)));
        assert_eq!(board.items[0].delivery_date, Some(d(2024, 5, 6)));
    }

    #[test]
    fn resize_preview_is_exposed_as_marker() {
        let mut engine = engine();
        let mut board = Board {
            items: vec![WorkItem::new("a", "A").with_dates(Some(d(2024, 5, 1)), Some(d(2024, 5, 10)))],
        };
        engine.recompute(&board.items);
        let snapshot = board.items.clone();
        engine.pointer_down(&snapshot, "a", PointerTarget::Handle(Edge::End), 45.0, false, &mut board);
        engine.pointer_move(&snapshot, 100.0, &mut board);
        let view = engine.recompute(&board.items);
        assert_eq!(view.preview_x, Some(100.0));
    }

    #[test]
    fn hit_test_finds_handles_and_body() {
        let mut engine = engine();
        engine.set_zoom(ZoomLevel::Day);
        let items = [WorkItem::new("a", "A").with_dates(Some(d(2024, 5, 2)), Some(d(2024, 5, 3)))];
        let view = engine.recompute(&items);
        // x = 40, width = 80
        assert_eq!(view.hit_test(0, 41.0).map(|(_, t)| t), Some(PointerTarget::Handle(Edge::Start)));
        assert_eq!(view.hit_test(0, 80.0).map(|(_, t)| t), Some(PointerTarget::Body));
        assert_eq!(view.hit_test(0, 118.0).map(|(_, t)| t), Some(PointerTarget::Handle(Edge::End)));
        assert!(view.hit_test(0, 130.0).is_none());
        assert!(view.hit_test(1, 80.0).is_none());
    }

    #[test]
    fn tones_prefer_blocked_over_status() {
        let mut item = WorkItem::new("a", "A");
        item.status = Status::Done;
        assert_eq!(BarTone::of(&item), BarTone::Done);
        item.has_risk = true;
        assert_eq!(BarTone::of(&item), BarTone::AtRisk);
        item.is_blocked = true;
        assert_eq!(BarTone::of(&item), BarTone::Blocked);
    }

    #[test]
    fn zoom_steps_through_engine() {
        let mut engine = engine();
        engine.zoom_out();
        assert_eq!(engine.zoom(), ZoomLevel::Quarter);
        engine.zoom_in();
        engine.zoom_in();
        assert_eq!(engine.zoom(), ZoomLevel::Week);
    }
}
