//! `spl progress [ITERATION]`: iteration progress and item completion.
//!
//! Shows, per iteration, how far the reference date is through the
//! iteration (working-day or calendar weighted) next to how many of the
//! iteration's items are done.

use std::io::Write;

use chrono::NaiveDate;
use clap::Args;
use sprintline_core::error::ErrorCode;
use sprintline_core::model::{Iteration, active_iteration};
use sprintline_core::progress::{IterationSummary, Weighting};
use sprintline_core::{TimelineEngine, WorkingDayCalendar};

use super::{Session, local_today};
use crate::output::{CliError, percent_bar, pretty_kv, pretty_rule, render_mode, report};

/// Arguments for `spl progress`.
#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// Iteration id. Omit to summarize every iteration.
    pub iteration: Option<String>,

    /// Only the iteration currently marked active.
    #[arg(long, conflicts_with = "iteration")]
    pub active: bool,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub at: Option<NaiveDate>,

    /// Override the configured weighting (working-days or calendar).
    #[arg(long)]
    pub weighting: Option<Weighting>,
}

/// Execute `spl progress`.
pub fn run_progress(args: &ProgressArgs, session: &Session) -> anyhow::Result<()> {
    let board = session.load_board()?;
    let reference = args.at.unwrap_or_else(local_today);

    let selected: Vec<&Iteration> = if let Some(id) = &args.iteration {
        match board.require_iteration(id) {
            Ok(iteration) => vec![iteration],
            Err(err) => {
                return Err(report(session.output, CliError::coded(err.to_string(), err.code())));
            }
        }
    } else if args.active {
        let Some(active) = active_iteration(&board.iterations) else {
            return Err(report(
                session.output,
                CliError::coded("no active iteration", ErrorCode::IterationNotFound),
            ));
        };
        vec![active]
    } else {
        board.iterations.iter().collect()
    };

    let summaries: Vec<IterationSummary> = match args.weighting {
        Some(weighting) => {
            let calendar = WorkingDayCalendar::new(session.config.calendar.locale);
            selected
                .into_iter()
                .map(|iteration| {
                    IterationSummary::build(iteration, &board.items, reference, weighting, &calendar)
                })
                .collect()
        }
        None => {
            let engine: TimelineEngine = session.engine(Some(reference));
            selected
                .into_iter()
                .map(|iteration| engine.summarize(iteration, &board.items, reference))
                .collect()
        }
    };

    render_mode(
        session.output,
        &summaries,
        |summaries, w| render_progress_text(summaries, w),
        |summaries, w| render_progress_pretty(summaries, w),
    )
}

fn render_progress_text(summaries: &[IterationSummary], w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "id\tstatus\tstart\tend\tprogress\telapsed\tdone\ttotal\tdays_left")?;
    for s in summaries {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{:.1}\t{:.1}\t{}\t{}\t{}",
            s.id,
            s.status,
            s.start_date,
            s.end_date,
            s.progress,
            s.elapsed_progress,
            s.items.done,
            s.items.total,
            s.days_remaining
        )?;
    }
    Ok(())
}

fn render_progress_pretty(summaries: &[IterationSummary], w: &mut dyn Write) -> std::io::Result<()> {
    if summaries.is_empty() {
        writeln!(w, "(no iterations)")?;
        return Ok(());
    }

    for (idx, s) in summaries.iter().enumerate() {
        if idx > 0 {
            writeln!(w)?;
        }
        writeln!(w, "{} [{}]", s.name, s.status)?;
        pretty_rule(w)?;
        pretty_kv(w, "Dates", format!("{} .. {}", s.start_date, s.end_date))?;
        pretty_kv(
            w,
            "Progress",
            format!("{:>5.1}% {} ({})", s.progress, percent_bar(s.progress, 16), s.weighting),
        )?;
        pretty_kv(
            w,
            "Elapsed",
            format!("{:>5.1}% {}", s.elapsed_progress, percent_bar(s.elapsed_progress, 16)),
        )?;
        pretty_kv(
            w,
            "Items",
            format!(
                "{}/{} done ({:.0}%), {} in progress, {} in review, {} todo",
                s.items.done, s.items.total, s.completion, s.items.in_progress, s.items.in_review, s.items.todo
            ),
        )?;
        pretty_kv(w, "Workdays", s.working_days_total.to_string())?;
        let remaining = match s.days_remaining {
            d if d < 0 => format!("ended {} days ago", -d),
            0 => "ends today".to_string(),
            d => format!("{d} days left"),
        };
        pretty_kv(w, "Remaining", remaining)?;
    }
    Ok(())
}
