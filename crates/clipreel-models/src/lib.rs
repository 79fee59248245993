//! Shared data models for ClipReel.
//!
//! This crate provides Serde-serializable types for:
//! - Schedules and the compilation windows derived from them
//! - Clips and games as returned by the clip catalog
//! - Time ranges used when querying the catalog
//! - Compilation results and chapter timestamps

pub mod clip;
pub mod compilation;
pub mod game;
pub mod schedule;
pub mod time_range;
pub mod timestamp;
pub mod window;

// Re-export common types
pub use clip::{Clip, SourceVersion, User};
pub use compilation::{CompilationResult, ProcessId, SoftError};
pub use game::Game;
pub use schedule::{Schedule, ScheduleId};
pub use time_range::{TimeRange, TimeRangeError, OPEN_START_SPAN};
pub use timestamp::format_chapter_timestamp;
pub use window::{Window, WindowState, RELEASE_OFFSET};
