#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, Reported, render_error};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sprintline: Gantt timeline for sprint boards",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (pretty, text, json). Overrides config and SPRINTLINE_FORMAT.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Board file. Defaults to .sprintline/board.json.
    #[arg(long, global = true, value_name = "PATH")]
    board: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Explicit output mode from flags, if any. `--format` wins over `--json`.
    fn output_override(&self) -> Option<OutputMode> {
        self.format
            .or_else(|| self.json.then_some(OutputMode::Json))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show the timeline",
        long_about = "Resolve the twelve-month window for the board and print its header segments and bars.",
        after_help = "EXAMPLES:\n    # Timeline at the configured zoom\n    spl timeline\n\n    # Week zoom, six months later\n    spl timeline --zoom week --shift 6\n\n    # Emit machine-readable output\n    spl timeline --json"
    )]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show iteration progress",
        long_about = "Show how far each iteration has elapsed next to how many of its items are done.",
        after_help = "EXAMPLES:\n    # All iterations\n    spl progress\n\n    # One iteration at a given date, calendar weighted\n    spl progress S1 --at 2024-01-15 --weighting calendar\n\n    # Emit machine-readable output\n    spl progress --active --json"
    )]
    Progress(cmd::progress::ProgressArgs),

    #[command(
        next_help_heading = "Read",
        about = "Count working days",
        long_about = "Count working days in an inclusive date range, skipping weekends and holidays.",
        after_help = "EXAMPLES:\n    # Working days in May 2024\n    spl workdays 2024-05-01 2024-05-31\n\n    # Weekends only, no holidays\n    spl workdays 2024-05-01 2024-05-31 --locale weekends-only"
    )]
    Workdays(cmd::workdays::WorkdaysArgs),

    #[command(
        next_help_heading = "Schedule",
        about = "Move an item to a new start date",
        long_about = "Drag an item's bar to a new start date, keeping its duration, and save the board.",
        after_help = "EXAMPLES:\n    # Move an item\n    spl reschedule task-1 --start 2024-04-02\n\n    # Emit machine-readable output\n    spl reschedule task-1 --start 2024-04-02 --json"
    )]
    Reschedule(cmd::reschedule::RescheduleArgs),

    #[command(
        next_help_heading = "Schedule",
        about = "Move one end of an item",
        long_about = "Resize an item's bar from its start or end edge and save the board.",
        after_help = "EXAMPLES:\n    # Extend delivery\n    spl resize task-1 --edge end --to 2024-04-20\n\n    # Start earlier\n    spl resize task-1 --edge start --to 2024-03-25"
    )]
    Resize(cmd::reschedule::ResizeArgs),

    #[command(
        next_help_heading = "Interactive",
        about = "Open the interactive timeline",
        long_about = "Open a full-screen timeline. Drag bars to move them, drag their ends to resize. Changes are saved on quit.",
        after_help = "KEYS:\n    +/-   zoom in/out\n    h/l   move window back/forward six months\n    t     back to today\n    c     clear header focus\n    esc   clear selection\n    q     save and quit"
    )]
    Tui(cmd::tui::TuiArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    spl completions bash > ~/.local/share/bash-completion/completions/spl\n\n    # Zsh\n    spl completions zsh > ~/.zfunc/_spl"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SPRINTLINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "spl=debug,sprintline_core=debug,info"
        } else {
            "spl=info,sprintline_core=info,warn"
        })
    });

    let format = env::var("SPRINTLINE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<Reported>().is_none() {
                let mode = cli.output_override().unwrap_or(OutputMode::Text);
                // Nothing more can be done if stderr itself fails.
                let _ = render_error(mode, &CliError::plain(format!("{err:#}")));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Completions(ref args) = cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args, &mut command);
    }

    let project_root = env::current_dir()?;
    let session = cmd::Session::resolve(
        &project_root,
        cli.board.clone(),
        cli.output_override(),
        cli.json,
    )?;
    debug!(command = ?cli.command, "dispatching");

    match cli.command {
        Commands::Timeline(ref args) => cmd::timeline::run_timeline(args, &session),
        Commands::Progress(ref args) => cmd::progress::run_progress(args, &session),
        Commands::Workdays(ref args) => cmd::workdays::run_workdays(args, &session),
        Commands::Reschedule(ref args) => cmd::reschedule::run_reschedule(args, &session),
        Commands::Resize(ref args) => cmd::reschedule::run_resize(args, &session),
        Commands::Tui(ref args) => cmd::tui::run_tui(args, &session),
        Commands::Completions(_) => Ok(()),
    }
}
