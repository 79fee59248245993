//! Scheduling pass.
//!
//! A pass brings every schedule's windows up to date and compiles the ones
//! that are due. Failures are contained per schedule and per window: they
//! are logged, counted and reported, and the pass moves on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use clipreel_models::{Schedule, ScheduleId, Window};

use crate::assembler::Assembler;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics::{record_schedule_failure, record_windows_created};
use crate::scheduler::{compute_missing_windows, due_windows};
use crate::store::WindowStore;

/// A window compiled during the pass.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledWindow {
    pub schedule_id: ScheduleId,
    pub window_start: DateTime<Utc>,
    pub process_id: String,
    pub artifact_path: String,
}

/// A schedule or window that failed during the pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassFailure {
    pub schedule_id: ScheduleId,
    pub window_start: Option<DateTime<Utc>>,
    pub stage: &'static str,
    pub message: String,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub schedules: usize,
    pub windows_created: usize,
    pub compiled: Vec<CompiledWindow>,
    pub failures: Vec<PassFailure>,
    pub cancelled: bool,
}

impl PassReport {
    fn fail(&mut self, schedule_id: ScheduleId, window_start: Option<DateTime<Utc>>, err: &WorkerError) {
        warn!(
            schedule_id = %schedule_id,
            window_start = ?window_start,
            stage = err.stage(),
            error = %err,
            "Scheduling pass step failed"
        );
        record_schedule_failure(err.stage());
        self.failures.push(PassFailure {
            schedule_id,
            window_start,
            stage: err.stage(),
            message: err.to_string(),
        });
    }
}

pub struct SchedulePass {
    store: Arc<dyn WindowStore>,
    assembler: Arc<Assembler>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl SchedulePass {
    pub fn new(store: Arc<dyn WindowStore>, assembler: Arc<Assembler>) -> Self {
        Self {
            store,
            assembler,
            cancel_rx: None,
        }
    }

    /// Stop starting new compiles once the signal flips to true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Run one pass at `now`.
    ///
    /// Only a failure to list schedules aborts the pass.
    pub async fn run(&self, now: DateTime<Utc>) -> WorkerResult<PassReport> {
        let schedules = self.store.list_schedules().await?;
        let mut report = PassReport {
            schedules: schedules.len(),
            ..Default::default()
        };

        let mut pending: Vec<Window> = Vec::new();
        for schedule in &schedules {
            match self.plan(schedule, now).await {
                Ok((created, windows)) => {
                    report.windows_created += created;
                    pending.extend(windows);
                }
                Err(e) => report.fail(schedule.id, None, &e),
            }
        }
        record_windows_created(report.windows_created);

        let by_id: HashMap<ScheduleId, Schedule> =
            schedules.into_iter().map(|s| (s.id, s)).collect();
        let due = due_windows(&pending, &by_id, now);
        info!(
            schedules = report.schedules,
            created = report.windows_created,
            due = due.len(),
            "Planned scheduling pass"
        );

        for window in due {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(schedule) = by_id.get(&window.schedule_id) else {
                continue;
            };
            match self.compile(&window, schedule).await {
                Ok(done) => report.compiled.push(done),
                Err(e) => report.fail(window.schedule_id, Some(window.start), &e),
            }
        }

        info!(
            compiled = report.compiled.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Scheduling pass finished"
        );
        Ok(report)
    }

    /// Insert missing windows for `schedule` and return its pending ones.
    async fn plan(&self, schedule: &Schedule, now: DateTime<Utc>) -> WorkerResult<(usize, Vec<Window>)> {
        let existing = self.store.count_windows(schedule.id).await?;
        let persisted = self.store.list_windows(schedule.id).await?;
        let missing = compute_missing_windows(schedule, existing, persisted.first(), now)?;
        if !missing.is_empty() {
            info!(schedule_id = %schedule.id, count = missing.len(), "Creating windows");
            self.store.insert_windows(&missing).await?;
        }

        let created = missing.len();
        let pending = persisted
            .into_iter()
            .chain(missing)
            .filter(Window::is_pending)
            .collect();
        Ok((created, pending))
    }

    async fn compile(&self, window: &Window, schedule: &Schedule) -> WorkerResult<CompiledWindow> {
        let result = self.assembler.compile_window(window, schedule).await?;
        self.store
            .set_artifact_location(window.schedule_id, window.start, &result.artifact_path)
            .await?;
        Ok(CompiledWindow {
            schedule_id: window.schedule_id,
            window_start: window.start,
            process_id: result.process_id.to_string(),
            artifact_path: result.artifact_path,
        })
    }
}
