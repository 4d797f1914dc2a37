//! `spl timeline`: print the resolved timeline window, headers, and bars.

use std::io::Write;

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use sprintline_core::coords::ZoomLevel;
use sprintline_core::engine::{TimelineBar, TimelineView};

use super::Session;
use crate::output::{pretty_kv, pretty_section, render_mode};

/// Arguments for `spl timeline`.
#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Zoom level (day, week, month, quarter). Defaults to the configured zoom.
    #[arg(long)]
    pub zoom: Option<ZoomLevel>,

    /// Anchor the twelve-month window on the month of this date.
    #[arg(long, value_name = "DATE")]
    pub focus: Option<NaiveDate>,

    /// Shift the window by this many months from where the data puts it.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub shift: i32,

    /// Date treated as today (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,

    /// Width of the bar chart column in pretty output.
    #[arg(long, default_value_t = 48)]
    pub width: usize,
}

#[derive(Debug, Serialize)]
struct TimelineReport {
    today: NaiveDate,
    #[serde(flatten)]
    view: TimelineView,
}

/// Execute `spl timeline`.
pub fn run_timeline(args: &TimelineArgs, session: &Session) -> anyhow::Result<()> {
    let board = session.load_board()?;
    let mut engine = session.engine(args.today);
    if let Some(zoom) = args.zoom {
        engine.set_zoom(zoom);
    }

    if args.shift != 0 {
        engine.navigate_months(&board.items, args.shift);
    }
    if let Some(focus) = args.focus {
        engine.focus(focus);
    }

    let report = TimelineReport {
        today: engine.today(),
        view: engine.recompute(&board.items),
    };
    let width = args.width.max(8);

    render_mode(
        session.output,
        &report,
        |report, w| render_timeline_text(report, w),
        |report, w| render_timeline_pretty(report, width, w),
    )
}

fn render_timeline_text(report: &TimelineReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "id\tstart\tend\tx\twidth\ttone\tselected")?;
    for bar in &report.view.bars {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            bar.item_id,
            bar.start,
            bar.end,
            bar.x,
            bar.width,
            bar.tone.as_str(),
            bar.is_selected
        )?;
    }
    Ok(())
}

fn render_timeline_pretty(
    report: &TimelineReport,
    width: usize,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    let view = &report.view;
    pretty_section(
        w,
        &format!(
            "Timeline {} .. {} ({})",
            view.window.start(),
            view.window.end(),
            view.zoom
        ),
    )?;
    pretty_kv(w, "Today", report.today.to_string())?;
    pretty_kv(w, "Headers", header_summary(view))?;
    writeln!(w)?;

    if view.bars.is_empty() {
        writeln!(w, "(no items)")?;
        return Ok(());
    }

    for bar in &view.bars {
        writeln!(
            w,
            "{:<24} {} {} .. {}",
            truncate(&bar.title, 24),
            gantt_row(bar, view.total_width, view.today_x, width),
            bar.start,
            bar.end
        )?;
    }
    Ok(())
}

fn header_summary(view: &TimelineView) -> String {
    let (Some(first), Some(last)) = (view.headers.first(), view.headers.last()) else {
        return String::from("-");
    };
    format!("{} segments, {} .. {}", view.headers.len(), first.title(), last.title())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Scale one bar onto `cols` character cells spanning the window body.
fn gantt_row(bar: &TimelineBar, total_width: f64, today_x: f64, cols: usize) -> String {
    let total = total_width.max(1.0);
    let to_col = |x: f64| ((x / total) * cols as f64).floor();
    let start = to_col(bar.x);
    let end = to_col(bar.x + bar.width).max(start + 1.0);
    let today = to_col(today_x);

    (0..cols)
        .map(|col| {
            let c = col as f64;
            if c >= start && c < end {
                '█'
            } else if (c - today).abs() < f64::EPSILON {
                '┆'
            } else {
                '·'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintline_core::engine::BarTone;

    fn bar(x: f64, width: f64) -> TimelineBar {
        TimelineBar {
            item_id: "a".into(),
            title: "A".into(),
            row: 0,
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            x,
            width,
            is_selected: false,
            is_active: false,
            tone: BarTone::Neutral,
            progress: None,
        }
    }

    #[test]
    fn gantt_row_places_bar_and_today() {
        let row = gantt_row(&bar(250.0, 250.0), 1000.0, 900.0, 8);
        assert_eq!(row, "··██···┆");
    }

    #[test]
    fn narrow_bar_gets_one_cell() {
        let row = gantt_row(&bar(0.0, 1.0), 1000.0, -50.0, 4);
        assert_eq!(row, "█···");
    }

    #[test]
    fn bars_left_of_window_are_clipped() {
        let row = gantt_row(&bar(-500.0, 100.0), 1000.0, -50.0, 4);
        assert_eq!(row, "····");
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
