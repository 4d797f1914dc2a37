//! `spl reschedule` and `spl resize`: move or stretch one item's bar
//! without a pointer.
//!
//! Both replay the gesture the timeline would see: press on the bar (or one
//! of its edge handles), move to the pixel offset of the target date, and
//! release. Whatever the engine commits is written back to the board.

use std::io::Write;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;
use sprintline_core::board::{Board, BoardLock};
use sprintline_core::engine::TimelineEngine;
use sprintline_core::interaction::{Edge, PointerTarget};
use sprintline_core::model::WorkItem;
use tracing::info;

use super::Session;
use crate::output::{pretty_kv, render_mode};

/// Arguments for `spl reschedule`.
#[derive(Args, Debug)]
pub struct RescheduleArgs {
    /// Item id.
    pub id: String,

    /// New start date; the item's duration is kept.
    #[arg(long, value_name = "DATE")]
    pub start: NaiveDate,

    /// Date treated as today for undated items.
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

/// Bar edge selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EdgeArg {
    Start,
    End,
}

impl From<EdgeArg> for Edge {
    fn from(value: EdgeArg) -> Self {
        match value {
            EdgeArg::Start => Self::Start,
            EdgeArg::End => Self::End,
        }
    }
}

/// Arguments for `spl resize`.
#[derive(Args, Debug)]
pub struct ResizeArgs {
    /// Item id.
    pub id: String,

    /// Which end of the bar to move.
    #[arg(long, value_enum)]
    pub edge: EdgeArg,

    /// Target date for that edge. Clamped to keep at least one day.
    #[arg(long, value_name = "DATE")]
    pub to: NaiveDate,

    /// Date treated as today for undated items.
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ScheduleChange {
    id: String,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_date: Option<NaiveDate>,
}

impl ScheduleChange {
    fn of(item: &WorkItem, changed: bool) -> Self {
        Self {
            id: item.id.clone(),
            changed,
            start_date: item.start_date,
            delivery_date: item.delivery_date,
        }
    }
}

/// Execute `spl reschedule`.
pub fn run_reschedule(args: &RescheduleArgs, session: &Session) -> anyhow::Result<()> {
    let (mut board, lock) = session.load_board_locked()?;
    let before = require_item(&board, &args.id, session)?;

    let mut engine = session.engine(args.today);
    replay_drag(&mut engine, &mut board, &args.id, args.start);
    finish(session, &board, &before, &lock)
}

/// Execute `spl resize`.
pub fn run_resize(args: &ResizeArgs, session: &Session) -> anyhow::Result<()> {
    let (mut board, lock) = session.load_board_locked()?;
    let before = require_item(&board, &args.id, session)?;

    let mut engine = session.engine(args.today);
    replay_resize(&mut engine, &mut board, &args.id, args.edge.into(), args.to);
    finish(session, &board, &before, &lock)
}

fn require_item(board: &Board, id: &str, session: &Session) -> anyhow::Result<WorkItem> {
    board
        .require_item(id)
        .cloned()
        .map_err(|err| session.report_board(&err))
}

/// Press on the bar body, move by the pixel distance to `start`, release.
pub fn replay_drag(engine: &mut TimelineEngine, board: &mut Board, id: &str, start: NaiveDate) {
    let items = board.items.clone();
    let view = engine.recompute(&items);
    let Some(bar) = view.bars.iter().find(|bar| bar.item_id == id) else {
        return;
    };
    let mapper = engine.mapper();
    let grab = bar.x + bar.width / 2.0;
    let target = grab + (mapper.date_to_x(start) - mapper.date_to_x(bar.start));

    engine.pointer_down(&items, id, PointerTarget::Body, grab, false, board);
    engine.pointer_move(&items, target, board);
    let items = board.items.clone();
    engine.pointer_up(&items, board);
}

/// Press on an edge handle, move to `date`, release.
pub fn replay_resize(
    engine: &mut TimelineEngine,
    board: &mut Board,
    id: &str,
    edge: Edge,
    date: NaiveDate,
) {
    let items = board.items.clone();
    let view = engine.recompute(&items);
    let Some(bar) = view.bars.iter().find(|bar| bar.item_id == id) else {
        return;
    };
    let grab = match edge {
        Edge::Start => bar.x,
        Edge::End => bar.x + bar.width,
    };
    let target = engine.mapper().date_to_x(date);

    engine.pointer_down(&items, id, PointerTarget::Handle(edge), grab, false, board);
    engine.pointer_move(&items, target, board);
    engine.pointer_up(&items, board);
}

fn finish(
    session: &Session,
    board: &Board,
    before: &WorkItem,
    lock: &BoardLock,
) -> anyhow::Result<()> {
    let item = board.require_item(&before.id)?;
    let changed = item != before;

    if changed {
        session.save_board_locked(board, lock)?;
        info!(item = %item.id, "schedule updated");
    }

    render_mode(
        session.output,
        &ScheduleChange::of(item, changed),
        |change, w| {
            writeln!(
                w,
                "{}\t{}\t{}",
                change.id,
                opt_date(change.start_date),
                opt_date(change.delivery_date)
            )
        },
        |change, w| {
            let verb = if change.changed { "Updated" } else { "Unchanged" };
            writeln!(w, "{verb} {}", change.id)?;
            pretty_kv(w, "Start", opt_date(change.start_date))?;
            pretty_kv(w, "Delivery", opt_date(change.delivery_date))
        },
    )
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintline_core::engine::EngineOptions;
    use sprintline_core::coords::ZoomLevel;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn board() -> Board {
        Board {
            items: vec![
                WorkItem::new("a", "A").with_dates(Some(d(2024, 3, 1)), Some(d(2024, 3, 8))),
                WorkItem::new("b", "B"),
            ],
            ..Board::default()
        }
    }

    fn engine(zoom: ZoomLevel) -> TimelineEngine {
        TimelineEngine::new(
            d(2024, 3, 20),
            EngineOptions {
                zoom,
                ..EngineOptions::default()
            },
        )
    }

    #[test]
    fn drag_replay_moves_both_dates_at_every_zoom() {
        for zoom in ZoomLevel::ALL {
            let mut board = board();
            replay_drag(&mut engine(zoom), &mut board, "a", d(2024, 4, 2));
            let item = board.item("a").unwrap();
            assert_eq!(item.start_date, Some(d(2024, 4, 2)), "{zoom}");
            assert_eq!(item.delivery_date, Some(d(2024, 4, 9)), "{zoom}");
        }
    }

    #[test]
    fn drag_replay_backwards_before_window() {
        let mut board = board();
        replay_drag(&mut engine(ZoomLevel::Week), &mut board, "a", d(2023, 12, 30));
        assert_eq!(board.item("a").unwrap().start_date, Some(d(2023, 12, 30)));
    }

    #[test]
    fn drag_replay_to_same_start_commits_nothing() {
        let mut board = board();
        replay_drag(&mut engine(ZoomLevel::Day), &mut board, "a", d(2024, 3, 1));
        assert!(board.item("a").unwrap().updated_at.is_none());
    }

    #[test]
    fn resize_replay_changes_one_field() {
        let mut board = board();
        replay_resize(&mut engine(ZoomLevel::Month), &mut board, "a", Edge::End, d(2024, 3, 20));
        let item = board.item("a").unwrap();
        assert_eq!(item.start_date, Some(d(2024, 3, 1)));
        assert_eq!(item.delivery_date, Some(d(2024, 3, 20)));
    }

    #[test]
    fn resize_replay_clamps_inverted_start() {
        let mut board = board();
        replay_resize(&mut engine(ZoomLevel::Day), &mut board, "a", Edge::Start, d(2024, 3, 30));
        assert_eq!(board.item("a").unwrap().start_date, Some(d(2024, 3, 7)));
    }

    #[test]
    fn undated_item_resize_writes_only_delivery() {
        let mut board = board();
        replay_resize(&mut engine(ZoomLevel::Week), &mut board, "b", Edge::End, d(2024, 4, 1));
        let item = board.item("b").unwrap();
        assert_eq!(item.start_date, None);
        assert_eq!(item.delivery_date, Some(d(2024, 4, 1)));
    }
}
