//! Compilation worker.
//!
//! This crate provides:
//! - Window scheduling for recurring compilation schedules
//! - Clip selection under blacklist, repeat and duration policies
//! - The compilation assembler (download, normalize, concatenate, describe)
//! - Schedule and window storage
//! - The scheduling pass run by the worker binary and the API

pub mod assembler;
pub mod blacklist;
pub mod config;
pub mod context;
pub mod description;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pass;
pub mod scheduler;
pub mod selection;
pub mod store;

pub use assembler::{Assembler, CompileRequest};
pub use blacklist::Blacklist;
pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use logging::CompileLogger;
pub use pass::{PassReport, SchedulePass};
pub use scheduler::{compute_missing_windows, due_windows};
pub use selection::{Selection, SelectionPolicy};
pub use store::{JsonFileStore, MemoryStore, StoreError, WindowStore};
