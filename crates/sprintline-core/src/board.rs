//! Board file: the items, iterations, and dependencies a host persists.
//!
//! The board is plain JSON. Loading validates id uniqueness and iteration
//! bounds; saving takes an advisory lock, writes a sibling temp file and
//! renames it into place.
//!
//! Short edits hold the lock from load to save ([`Board::load_locked`]).
//! Long-lived hosts keep the board they loaded as a snapshot and write back
//! only what changed since then ([`Board::save_changes`]), so edits made by
//! other processes in between survive.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PROJECT_DIR;
use crate::error::ErrorCode;
use crate::interaction::TimelineHost;
use crate::model::{Dependency, Iteration, ModelError, WorkItem};

/// Errors returned while loading, validating, or saving a board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read board file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse board file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write board file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("board file {} is locked (waited {waited:?})", path.display())]
    Locked { path: PathBuf, waited: Duration },

    #[error("duplicate {what} id '{id}'")]
    DuplicateId { what: &'static str, id: String },

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("iteration not found: {0}")]
    IterationNotFound(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl BoardError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::BoardNotFound,
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::BoardParseError,
            Self::Write { .. } => ErrorCode::BoardWriteFailed,
            Self::Locked { .. } => ErrorCode::BoardLocked,
            Self::DuplicateId { .. } => ErrorCode::DuplicateId,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::IterationNotFound(_) => ErrorCode::IterationNotFound,
            Self::Model(err) => err.code(),
        }
    }
}

/// How long [`Board::save`] waits for a competing writer.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Exclusive advisory lock on `<board>.lock`, released on drop.
#[derive(Debug)]
pub struct BoardLock {
    file: File,
    path: PathBuf,
}

impl BoardLock {
    /// Poll for the lock beside `board_path` until `timeout` passes.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Locked`] on timeout and [`BoardError::Write`]
    /// when the lock file cannot be opened.
    pub fn acquire(board_path: &Path, timeout: Duration) -> Result<Self, BoardError> {
        let path = board_path.with_extension("lock");
        let io_err = |source: io::Error| BoardError::Write {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        let start = Instant::now();
        while file.try_lock_exclusive().is_err() {
            if start.elapsed() >= timeout {
                return Err(BoardError::Locked {
                    path,
                    waited: start.elapsed(),
                });
            }
            thread::sleep(Duration::from_millis(10));
        }
        debug!(path = %path.display(), "board lock acquired");
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BoardLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_for_write(path: &Path) -> Result<BoardLock, BoardError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BoardError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    BoardLock::acquire(path, LOCK_TIMEOUT)
}

/// Default board location under a project root.
#[must_use]
pub fn default_board_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join("board.json")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub items: Vec<WorkItem>,
    #[serde(default)]
    pub iterations: Vec<Iteration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Board {
    /// Parse a board from JSON text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Parse`] for malformed JSON and the
    /// [`Board::validate`] errors for inconsistent content.
    pub fn from_json(path: &Path, json: &str) -> Result<Self, BoardError> {
        let board: Self = serde_json::from_str(json).map_err(|source| BoardError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        board.validate()?;
        Ok(board)
    }

    /// Load and validate the board at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] when the file is absent, otherwise
    /// read, parse, or validation errors.
    pub fn load(path: &Path) -> Result<Self, BoardError> {
        if !path.exists() {
            return Err(BoardError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let json = fs::read_to_string(path).map_err(|source| BoardError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let board = Self::from_json(path, &json)?;
        debug!(
            path = %path.display(),
            items = board.items.len(),
            iterations = board.iterations.len(),
            "board loaded"
        );
        Ok(board)
    }

    /// Take the board lock, then load. Hold the returned lock until the
    /// matching [`Board::save_locked`].
    ///
    /// # Errors
    ///
    /// [`BoardError::NotFound`] when the file is absent, [`BoardError::Locked`]
    /// on lock timeout, otherwise the [`Board::load`] errors.
    pub fn load_locked(path: &Path) -> Result<(Self, BoardLock), BoardError> {
        if !path.exists() {
            return Err(BoardError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let lock = BoardLock::acquire(path, LOCK_TIMEOUT)?;
        let board = Self::load(path)?;
        Ok((board, lock))
    }

    /// Write the board to `path` through a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Locked`] when another writer holds the lock
    /// and [`BoardError::Write`] when any filesystem step fails.
    pub fn save(&self, path: &Path) -> Result<(), BoardError> {
        let lock = lock_for_write(path)?;
        self.save_locked(path, &lock)
    }

    /// Write the board while the caller already holds its lock.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Write`] when any filesystem step fails.
    pub fn save_locked(&self, path: &Path, _lock: &BoardLock) -> Result<(), BoardError> {
        let write_err = |source| BoardError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut json = serde_json::to_string_pretty(self).map_err(|err| write_err(err.into()))?;
        json.push('\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        info!(path = %path.display(), "board saved");
        Ok(())
    }

    /// Items that are new or different compared to `snapshot`.
    pub fn changed_since<'a>(&'a self, snapshot: &'a Self) -> impl Iterator<Item = &'a WorkItem> {
        self.items
            .iter()
            .filter(move |item| snapshot.item(&item.id) != Some(*item))
    }

    /// Re-read the board under its lock, replace the items changed since
    /// `snapshot`, and write the result. Returns the board as written.
    ///
    /// Items removed from the file in the meantime are not brought back.
    ///
    /// # Errors
    ///
    /// Lock, read, parse, and write errors from the steps involved.
    pub fn save_changes(&self, snapshot: &Self, path: &Path) -> Result<Self, BoardError> {
        let lock = lock_for_write(path)?;
        let mut current = if path.exists() {
            Self::load(path)?
        } else {
            snapshot.clone()
        };

        let mut applied = 0_usize;
        for item in self.changed_since(snapshot) {
            match current.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(slot) => {
                    slot.clone_from(item);
                    applied += 1;
                }
                None => warn!(item = %item.id, "changed item no longer on board, skipped"),
            }
        }

        current.save_locked(path, &lock)?;
        debug!(applied, "board changes merged");
        Ok(current)
    }

    /// Check unique ids and iteration bounds.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), BoardError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(BoardError::DuplicateId {
                    what: "item",
                    id: item.id.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for iteration in &self.iterations {
            if !seen.insert(iteration.id.as_str()) {
                return Err(BoardError::DuplicateId {
                    what: "iteration",
                    id: iteration.id.clone(),
                });
            }
            iteration.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// # Errors
    ///
    /// Returns [`BoardError::ItemNotFound`] for an unknown id.
    pub fn require_item(&self, id: &str) -> Result<&WorkItem, BoardError> {
        self.item(id)
            .ok_or_else(|| BoardError::ItemNotFound(id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`BoardError::IterationNotFound`] for an unknown id.
    pub fn require_iteration(&self, id: &str) -> Result<&Iteration, BoardError> {
        self.iterations
            .iter()
            .find(|iteration| iteration.id == id)
            .ok_or_else(|| BoardError::IterationNotFound(id.to_string()))
    }

    /// Replace the stored item with the same id, stamping `updated_at`.
    /// Returns false when no such item exists.
    pub fn apply_update(&mut self, mut item: WorkItem) -> bool {
        let Some(slot) = self.items.iter_mut().find(|existing| existing.id == item.id) else {
            return false;
        };
        item.updated_at = Some(Utc::now());
        *slot = item;
        true
    }
}

impl TimelineHost for Board {
    fn commit_item_update(&mut self, item: WorkItem) {
        let id = item.id.clone();
        if !self.apply_update(item) {
            tracing::warn!(item = %id, "commit for item missing from board");
        }
    }
}
