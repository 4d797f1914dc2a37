pub mod completions;
pub mod progress;
pub mod reschedule;
pub mod timeline;
pub mod tui;
pub mod workdays;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use sprintline_core::board::{Board, BoardError, BoardLock, default_board_path};
use sprintline_core::config::{ProjectConfig, resolve_config};
use sprintline_core::engine::{EngineOptions, TimelineEngine};
use tracing::debug;

use crate::output::{CliError, OutputMode, report};

/// Per-invocation state shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    pub board_path: PathBuf,
    pub config: ProjectConfig,
    pub output: OutputMode,
}

impl Session {
    /// Resolve config and the board location for `project_root`.
    ///
    /// # Errors
    ///
    /// Fails when a config file exists but cannot be parsed.
    pub fn resolve(
        project_root: &Path,
        board: Option<PathBuf>,
        format: Option<OutputMode>,
        json: bool,
    ) -> Result<Self> {
        let effective = resolve_config(project_root, json)?;
        let output = format.unwrap_or_else(|| OutputMode::from_resolved(&effective.resolved_output));
        let board_path = board.unwrap_or_else(|| default_board_path(project_root));
        debug!(board = %board_path.display(), ?output, "session resolved");
        Ok(Self {
            board_path,
            config: effective.project,
            output,
        })
    }

    /// Render a board error in the session's output mode.
    pub fn report_board(&self, err: &BoardError) -> anyhow::Error {
        report(self.output, CliError::coded(err.to_string(), err.code()))
    }

    /// Load the board for reading, reporting failures in the session's output mode.
    ///
    /// # Errors
    ///
    /// Returns the board error after rendering it.
    pub fn load_board(&self) -> Result<Board> {
        Board::load(&self.board_path).map_err(|err| self.report_board(&err))
    }

    /// Load the board and keep it locked until the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns the board error after rendering it.
    pub fn load_board_locked(&self) -> Result<(Board, BoardLock)> {
        Board::load_locked(&self.board_path).map_err(|err| self.report_board(&err))
    }

    /// Save a board loaded with [`Session::load_board_locked`].
    ///
    /// # Errors
    ///
    /// Returns the board error after rendering it.
    pub fn save_board_locked(&self, board: &Board, lock: &BoardLock) -> Result<()> {
        board
            .save_locked(&self.board_path, lock)
            .map_err(|err| self.report_board(&err))
    }

    pub fn engine_options(&self) -> EngineOptions {
        self.config.engine_options()
    }

    pub fn engine(&self, today: Option<NaiveDate>) -> TimelineEngine {
        TimelineEngine::new(today.unwrap_or_else(local_today), self.engine_options())
    }
}

/// Today in the local time zone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
