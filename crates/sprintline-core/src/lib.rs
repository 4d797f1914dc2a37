//! sprintline-core library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in the library, each mapped to an
//!   [`error::ErrorCode`]; `anyhow::Result` only at config loading.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//! - **Dates**: local calendar days as [`chrono::NaiveDate`]; no time zones.

pub mod board;
pub mod calendar;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod header;
pub mod interaction;
pub mod model;
pub mod progress;

pub use calendar::{CalendarError, Locale, WorkingDayCalendar};
pub use coords::{CoordinateMapper, TimelineWindow, ZoomLevel};
pub use engine::{Direction, EngineOptions, TimelineBar, TimelineEngine, TimelineView};
pub use interaction::{Edge, InteractionController, ListenScope, PointerTarget, TimelineHost};
pub use progress::Weighting;
