//! `spl workdays START END`: count working days in an inclusive range.

use std::io::Write;

use chrono::{Datelike, NaiveDate};
use clap::Args;
use serde::Serialize;
use sprintline_core::calendar::{Holiday, Locale, WorkingDayCalendar};

use super::Session;
use crate::output::{CliError, pretty_kv, pretty_section, render_mode, report};

/// Arguments for `spl workdays`.
#[derive(Args, Debug)]
pub struct WorkdaysArgs {
    /// First day of the range (YYYY-MM-DD).
    pub start: NaiveDate,

    /// Last day of the range, inclusive.
    pub end: NaiveDate,

    /// Holiday set to apply. Defaults to the configured locale.
    #[arg(long)]
    pub locale: Option<Locale>,
}

#[derive(Debug, Serialize)]
struct WorkdaysReport {
    start: NaiveDate,
    end: NaiveDate,
    locale: Locale,
    working_days: u32,
    calendar_days: i64,
    holidays: Vec<Holiday>,
}

/// Execute `spl workdays`.
pub fn run_workdays(args: &WorkdaysArgs, session: &Session) -> anyhow::Result<()> {
    let locale = args.locale.unwrap_or(session.config.calendar.locale);
    let calendar = WorkingDayCalendar::new(locale);

    let working_days = match calendar.count_working_days(args.start, args.end) {
        Ok(count) => count,
        Err(err) => return Err(report(session.output, CliError::coded(err.to_string(), err.code()))),
    };

    let holidays = (args.start.year()..=args.end.year())
        .flat_map(|year| locale.holidays(year))
        .filter(|holiday| args.start <= holiday.date && holiday.date <= args.end)
        .collect();

    let report = WorkdaysReport {
        start: args.start,
        end: args.end,
        locale,
        working_days,
        calendar_days: (args.end - args.start).num_days() + 1,
        holidays,
    };

    render_mode(
        session.output,
        &report,
        |report, w| writeln!(w, "{}", report.working_days),
        |report, w| render_workdays_pretty(report, w),
    )
}

fn render_workdays_pretty(report: &WorkdaysReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Working days {} .. {}", report.start, report.end))?;
    pretty_kv(w, "Working", report.working_days.to_string())?;
    pretty_kv(w, "Calendar", report.calendar_days.to_string())?;
    if report.holidays.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "Holidays:")?;
    for holiday in &report.holidays {
        writeln!(w, "  {} {} ({})", holiday.date, holiday.name, holiday.date.format("%a"))?;
    }
    Ok(())
}
