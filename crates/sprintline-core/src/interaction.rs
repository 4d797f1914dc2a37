//! Pointer gestures over timeline bars.
//!
//! The controller is a small state machine: [`Gesture::Idle`], dragging a
//! bar, or resizing one of its edges. It owns the selection set. Dates are
//! written back through [`TimelineHost::commit_item_update`]; a drag commits
//! live on every move that changes the date, a resize commits once on
//! release.
//!
//! While a gesture is active the host is asked to deliver pointer events
//! from a wider [`ListenScope`] than the bar itself. Every way out of a
//! gesture goes through one exit path that unsubscribes exactly the scopes
//! the gesture subscribed.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::coords::{CoordinateMapper, add_days, days_between};
use crate::model::WorkItem;

/// Length given to items without a delivery date.
pub const DEFAULT_DURATION_DAYS: i64 = 7;

/// Width of the grab area at each end of a bar, in pixels.
pub const HANDLE_WIDTH: f64 = 3.0;

/// Which end of a bar a resize moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Start,
    End,
}

/// The part of a bar the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTarget {
    Body,
    Handle(Edge),
}

/// Where the host must deliver pointer events while a gesture is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenScope {
    /// The whole timeline surface, not just the grabbed bar.
    Timeline,
    /// Everything outside the timeline too.
    Document,
}

/// The host that owns work items and the pointer event sources.
pub trait TimelineHost {
    /// Persist a changed item. Called with the full updated item.
    fn commit_item_update(&mut self, item: WorkItem);

    fn subscribe(&mut self, _scope: ListenScope) {}

    fn unsubscribe(&mut self, _scope: ListenScope) {}
}

/// Read-only inputs a gesture step needs.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext<'a> {
    pub mapper: CoordinateMapper,
    pub today: NaiveDate,
    pub items: &'a [WorkItem],
}

impl GestureContext<'_> {
    fn find(&self, item_id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

/// Start date used for positioning: the item's own, or today.
#[must_use]
pub fn resolved_start(item: &WorkItem, today: NaiveDate) -> NaiveDate {
    item.start_date.unwrap_or(today)
}

/// End date used for positioning: the delivery date, or a week after the start.
#[must_use]
pub fn resolved_end(item: &WorkItem, today: NaiveDate) -> NaiveDate {
    item.delivery_date
        .unwrap_or_else(|| add_days(resolved_start(item, today), DEFAULT_DURATION_DAYS))
}

/// Days a drag keeps between start and delivery.
fn drag_duration(item: &WorkItem, today: NaiveDate) -> i64 {
    match item.delivery_date {
        Some(delivery) => days_between(resolved_start(item, today), delivery).max(0),
        None => DEFAULT_DURATION_DAYS,
    }
}

/// An in-progress move of a whole bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub item_id: String,
    grab_x: i64,
    grab_start: NaiveDate,
    last_start: NaiveDate,
    duration_days: i64,
    moved: bool,
    toggle: bool,
    was_selected: bool,
}

/// An in-progress resize of one bar edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeState {
    pub item_id: String,
    pub edge: Edge,
    pub preview: Option<NaiveDate>,
}

/// Current gesture. Exactly one is active at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging(DragState),
    Resizing(ResizeState),
}

impl Gesture {
    /// Scopes subscribed while this gesture is active.
    #[must_use]
    pub const fn scopes(&self) -> &'static [ListenScope] {
        match self {
            Self::Idle => &[],
            Self::Dragging(_) => &[ListenScope::Timeline],
            Self::Resizing(_) => &[ListenScope::Timeline, ListenScope::Document],
        }
    }

    /// Item the gesture is acting on, if any.
    #[must_use]
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Dragging(drag) => Some(drag.item_id.as_str()),
            Self::Resizing(resize) => Some(resize.item_id.as_str()),
        }
    }
}

/// Pixel offsets are compared at whole-pixel precision.
fn px(x: f64) -> i64 {
    x.round() as i64
}

/// Owns the selection set and the active gesture.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    selection: HashSet<String>,
}

impl InteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    #[must_use]
    pub const fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    #[must_use]
    pub fn is_selected(&self, item_id: &str) -> bool {
        self.selection.contains(item_id)
    }

    /// Live preview date of an active resize.
    #[must_use]
    pub const fn resize_preview(&self) -> Option<NaiveDate> {
        match &self.gesture {
            Gesture::Resizing(resize) => resize.preview,
            _ => None,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Plain click selects only `item_id`; a toggle click flips its membership.
    pub fn click(&mut self, item_id: &str, toggle: bool) {
        if toggle {
            if !self.selection.remove(item_id) {
                self.selection.insert(item_id.to_string());
            }
        } else {
            self.select_only(item_id);
        }
    }

    fn select_only(&mut self, item_id: &str) {
        self.selection.clear();
        self.selection.insert(item_id.to_string());
    }

    /// Pointer pressed on a bar or one of its handles.
    ///
    /// A gesture still active from a lost release is closed first.
    pub fn pointer_down(
        &mut self,
        item_id: &str,
        target: PointerTarget,
        x: f64,
        toggle: bool,
        ctx: &GestureContext<'_>,
        host: &mut impl TimelineHost,
    ) {
        self.finish(host);

        let Some(item) = ctx.find(item_id) else {
            warn!(item = item_id, "pointer down on unknown item");
            return;
        };

        let next = match target {
            PointerTarget::Body => {
                let was_selected = self.is_selected(item_id);
                if toggle {
                    self.selection.insert(item_id.to_string());
                } else if !was_selected {
                    self.select_only(item_id);
                }
                let grab_start = resolved_start(item, ctx.today);
                Gesture::Dragging(DragState {
                    item_id: item_id.to_string(),
                    grab_x: px(x),
                    grab_start,
                    last_start: grab_start,
                    duration_days: drag_duration(item, ctx.today),
                    moved: false,
                    toggle,
                    was_selected,
                })
            }
            PointerTarget::Handle(edge) => Gesture::Resizing(ResizeState {
                item_id: item_id.to_string(),
                edge,
                preview: None,
            }),
        };

        debug!(item = item_id, ?target, "gesture started");
        self.enter(next, host);
    }

    /// Pointer moved while a gesture may be active.
    pub fn pointer_move(&mut self, x: f64, ctx: &GestureContext<'_>, host: &mut impl TimelineHost) {
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Dragging(drag) => {
                let Some(item) = ctx.find(&drag.item_id) else {
                    warn!(item = %drag.item_id, "dragged item disappeared");
                    self.finish(host);
                    return;
                };

                let grab_x = ctx.mapper.date_to_x(drag.grab_start);
                let start = ctx.mapper.x_to_date(grab_x + (x - drag.grab_x as f64));
                trace!(item = %drag.item_id, x, %start, "drag move");
                if start == drag.last_start {
                    return;
                }

                let mut updated = item.clone();
                updated.start_date = Some(start);
                updated.delivery_date = Some(add_days(start, drag.duration_days));
                drag.last_start = start;
                drag.moved = true;

                debug!(item = %updated.id, %start, "drag commit");
                host.commit_item_update(updated);
            }
            Gesture::Resizing(resize) => {
                let date = ctx.mapper.x_to_date(x);
                trace!(item = %resize.item_id, %date, "resize preview");
                resize.preview = Some(date);
            }
        }
    }

    /// Pointer released. Ends any gesture; a resize commits here.
    pub fn pointer_up(&mut self, ctx: &GestureContext<'_>, host: &mut impl TimelineHost) {
        match &self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging(drag) if !drag.moved => {
                let (item_id, toggle, was_selected) =
                    (drag.item_id.clone(), drag.toggle, drag.was_selected);
                if !toggle {
                    self.select_only(&item_id);
                } else if was_selected {
                    self.selection.remove(&item_id);
                }
            }
            Gesture::Dragging(_) => {}
            Gesture::Resizing(resize) => {
                if let Some(updated) = resize_commit(resize, ctx) {
                    debug!(item = %updated.id, edge = ?resize.edge, "resize commit");
                    host.commit_item_update(updated);
                }
            }
        }
        self.finish(host);
    }

    /// Pointer left the timeline surface. Ends a drag; a resize keeps tracking.
    pub fn pointer_leave(&mut self, host: &mut impl TimelineHost) {
        if matches!(self.gesture, Gesture::Dragging(_)) {
            self.finish(host);
        }
    }

    /// The host lost pointer capture. Ends any gesture without committing.
    pub fn capture_lost(&mut self, host: &mut impl TimelineHost) {
        if !matches!(self.gesture, Gesture::Idle) {
            debug!(item = ?self.gesture.item_id(), "pointer capture lost");
        }
        self.finish(host);
    }

    fn enter(&mut self, next: Gesture, host: &mut impl TimelineHost) {
        for &scope in next.scopes() {
            host.subscribe(scope);
        }
        self.gesture = next;
    }

    fn finish(&mut self, host: &mut impl TimelineHost) {
        let done = std::mem::take(&mut self.gesture);
        for &scope in done.scopes().iter().rev() {
            host.unsubscribe(scope);
        }
    }
}

/// The single-field update a resize release produces, clamped to a one-day minimum.
fn resize_commit(resize: &ResizeState, ctx: &GestureContext<'_>) -> Option<WorkItem> {
    let candidate = resize.preview?;
    let Some(item) = ctx.find(&resize.item_id) else {
        warn!(item = %resize.item_id, "resized item disappeared");
        return None;
    };

    let mut updated = item.clone();
    match resize.edge {
        Edge::Start => {
            let end = resolved_end(item, ctx.today);
            updated.start_date = Some(if candidate < end {
                candidate
            } else {
                add_days(end, -1)
            });
        }
        Edge::End => {
            let start = resolved_start(item, ctx.today);
            updated.delivery_date = Some(if candidate > start {
                candidate
            } else {
                add_days(start, 1)
            });
        }
    }
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{TimelineWindow, ZoomLevel};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        commits: Vec<WorkItem>,
        scopes: Vec<ListenScope>,
        log: Vec<String>,
    }

    impl TimelineHost for Recorder {
        fn commit_item_update(&mut self, item: WorkItem) {
            self.commits.push(item);
        }

        fn subscribe(&mut self, scope: ListenScope) {
            self.scopes.push(scope);
            self.log.push(format!("+{scope:?}"));
        }

        fn unsubscribe(&mut self, scope: ListenScope) {
            self.scopes.retain(|s| *s != scope);
            self.log.push(format!("-{scope:?}"));
        }
    }

    fn items() -> Vec<WorkItem> {
        vec![
            WorkItem::new("a", "Alpha").with_dates(Some(d(2024, 3, 1)), Some(d(2024, 3, 8))),
            WorkItem::new("b", "Beta"),
        ]
    }

    fn ctx(items: &[WorkItem]) -> GestureContext<'_> {
        GestureContext {
            mapper: CoordinateMapper::new(ZoomLevel::Week, TimelineWindow::twelve_months_from(d(2024, 3, 1))),
            today: d(2024, 3, 20),
            items,
        }
    }

    #[test]
    fn drag_commits_live_and_preserves_duration() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();

        ctl.pointer_down("a", PointerTarget::Body, 50.0, false, &ctx(&items), &mut host);
        assert!(matches!(ctl.gesture(), Gesture::Dragging(_)));
        assert_eq!(host.scopes, vec![ListenScope::Timeline]);

        ctl.pointer_move(120.0, &ctx(&items), &mut host);
        ctl.pointer_move(190.0, &ctx(&items), &mut host);
        assert_eq!(host.commits.len(), 2);
        let last = host.commits.last().unwrap();
        assert_eq!(last.start_date, Some(d(2024, 3, 8)));
        assert_eq!(last.delivery_date, Some(d(2024, 3, 15)));

        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(ctl.gesture(), &Gesture::Idle);
        assert!(host.scopes.is_empty());
        assert_eq!(host.commits.len(), 2);
    }

    #[test]
    fn sub_day_jitter_does_not_commit() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Body, 50.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(55.0, &ctx(&items), &mut host);
        assert!(host.commits.is_empty());
    }

    #[test]
    fn undated_item_drags_with_default_week() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("b", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(40.0, &ctx(&items), &mut host);
        let commit = &host.commits[0];
        assert_eq!(commit.start_date, Some(d(2024, 3, 22)));
        assert_eq!(commit.delivery_date, Some(d(2024, 3, 29)));
    }

    #[test]
    fn leaving_timeline_ends_drag_without_rollback() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(140.0, &ctx(&items), &mut host);
        ctl.pointer_leave(&mut host);
        assert_eq!(ctl.gesture(), &Gesture::Idle);
        assert_eq!(host.commits.len(), 1);
        assert_eq!(host.log, vec!["+Timeline", "-Timeline"]);
    }

    #[test]
    fn resize_previews_then_commits_once() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::End), 0.0, false, &ctx(&items), &mut host);
        assert_eq!(host.scopes, vec![ListenScope::Timeline, ListenScope::Document]);

        ctl.pointer_move(400.0, &ctx(&items), &mut host);
        assert!(host.commits.is_empty());
        assert_eq!(ctl.resize_preview(), Some(d(2024, 3, 21)));

        ctl.pointer_leave(&mut host);
        assert!(matches!(ctl.gesture(), Gesture::Resizing(_)));

        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(host.commits.len(), 1);
        assert_eq!(host.commits[0].delivery_date, Some(d(2024, 3, 21)));
        assert_eq!(host.commits[0].start_date, Some(d(2024, 3, 1)));
        assert!(host.scopes.is_empty());
        assert_eq!(host.log, vec!["+Timeline", "+Document", "-Document", "-Timeline"]);
    }

    #[test]
    fn resize_end_before_start_clamps_to_next_day() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::End), 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(-100.0, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(host.commits[0].delivery_date, Some(d(2024, 3, 2)));
    }

    #[test]
    fn resize_start_past_end_clamps_to_previous_day() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::Start), 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(1000.0, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(host.commits[0].start_date, Some(d(2024, 3, 7)));
        assert_eq!(host.commits[0].delivery_date, Some(d(2024, 3, 8)));
    }

    #[test]
    fn resize_without_move_does_not_commit() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::Start), 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert!(host.commits.is_empty());
        assert_eq!(ctl.gesture(), &Gesture::Idle);
    }

    #[test]
    fn capture_loss_discards_resize_preview() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::End), 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_move(400.0, &ctx(&items), &mut host);
        ctl.capture_lost(&mut host);
        assert!(host.commits.is_empty());
        assert!(host.scopes.is_empty());
        assert_eq!(ctl.resize_preview(), None);
    }

    #[test]
    fn new_press_closes_stale_gesture() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("a", PointerTarget::Handle(Edge::End), 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_down("b", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        assert_eq!(host.scopes, vec![ListenScope::Timeline]);
        assert_eq!(ctl.gesture().item_id(), Some("b"));
    }

    #[test]
    fn plain_press_replaces_selection_unless_already_selected() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.click("a", false);
        ctl.click("b", true);
        assert_eq!(ctl.selection().len(), 2);

        // Pressing an already-selected bar keeps the group for a drag.
        ctl.pointer_down("a", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        assert_eq!(ctl.selection().len(), 2);
        ctl.pointer_move(140.0, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(ctl.selection().len(), 2);
    }

    #[test]
    fn click_without_movement_applies_click_selection() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.click("a", false);
        ctl.click("b", true);

        ctl.pointer_down("a", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert_eq!(ctl.selection().iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn toggle_click_flips_membership() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.click("a", false);

        ctl.pointer_down("b", PointerTarget::Body, 0.0, true, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert!(ctl.is_selected("a") && ctl.is_selected("b"));

        ctl.pointer_down("b", PointerTarget::Body, 0.0, true, &ctx(&items), &mut host);
        ctl.pointer_up(&ctx(&items), &mut host);
        assert!(ctl.is_selected("a"));
        assert!(!ctl.is_selected("b"));
    }

    #[test]
    fn resize_leaves_selection_alone() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.click("b", false);
        ctl.pointer_down("a", PointerTarget::Handle(Edge::Start), 0.0, false, &ctx(&items), &mut host);
        assert!(ctl.is_selected("b"));
        assert!(!ctl.is_selected("a"));
    }

    #[test]
    fn unknown_item_press_stays_idle() {
        let items = items();
        let mut host = Recorder::default();
        let mut ctl = InteractionController::new();
        ctl.pointer_down("zzz", PointerTarget::Body, 0.0, false, &ctx(&items), &mut host);
        assert_eq!(ctl.gesture(), &Gesture::Idle);
        assert!(host.scopes.is_empty());
    }
}
