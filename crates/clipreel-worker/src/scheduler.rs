//! Window scheduling.
//!
//! A schedule is cut into contiguous windows of `frequency_days`, each
//! ending one second before the next begins. Both functions here are pure;
//! callers persist what they return.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use clipreel_models::{Schedule, ScheduleId, Window, RELEASE_OFFSET};

use crate::error::{WorkerError, WorkerResult};

/// Windows whose release falls within this much of now are due.
pub const DUE_HORIZON: Duration = Duration::hours(48);

const TICK: Duration = Duration::seconds(1);

/// Number of cadence steps from the schedule start that begin before `now`.
pub fn expected_window_count(schedule: &Schedule, now: DateTime<Utc>) -> WorkerResult<usize> {
    let cadence = checked_cadence(schedule)?;
    let mut cursor = schedule.start_date;
    let mut count = 0usize;
    while cursor < now {
        count += 1;
        cursor = shift(schedule, cursor, cadence)?;
    }
    Ok(count)
}

/// Windows missing for `schedule`, oldest first.
///
/// `latest` is the most recent persisted window, if any. Generation seeds
/// from its end, or from one second before the schedule start, and stops
/// once a generated window ends at or after `now`. When `existing` already
/// covers the expected count nothing is generated.
pub fn compute_missing_windows(
    schedule: &Schedule,
    existing: usize,
    latest: Option<&Window>,
    now: DateTime<Utc>,
) -> WorkerResult<Vec<Window>> {
    let cadence = checked_cadence(schedule)?;
    let expected = expected_window_count(schedule, now)?;
    debug!(
        schedule_id = %schedule.id,
        existing,
        expected,
        "Counted windows"
    );
    if existing >= expected {
        return Ok(Vec::new());
    }

    let mut prev_end = match latest {
        Some(w) => w.end,
        None => shift(schedule, schedule.start_date, -TICK)?,
    };

    let mut windows = Vec::new();
    while prev_end < now {
        let start = shift(schedule, prev_end, TICK)?;
        let end = shift(schedule, start, cadence - TICK)?;
        // The release deadline must be representable too
        shift(schedule, end, RELEASE_OFFSET)?;
        windows.push(Window::new(schedule.id, start, end));
        prev_end = end;
    }
    Ok(windows)
}

/// Windows ready to compile at `now`.
///
/// A window is due when its release is within [`DUE_HORIZON`], its end has
/// passed and it has no artifact. Windows whose schedule is unknown or has
/// no game are skipped with a warning.
pub fn due_windows(
    windows: &[Window],
    schedules: &HashMap<ScheduleId, Schedule>,
    now: DateTime<Utc>,
) -> Vec<Window> {
    let horizon = now + DUE_HORIZON;
    windows
        .iter()
        .filter(|w| w.release < horizon && w.end < now && w.cache_destination.is_none())
        .filter(|w| match schedules.get(&w.schedule_id) {
            Some(schedule) if schedule.has_game() => true,
            Some(_) => {
                warn!(schedule_id = %w.schedule_id, "Schedule has no game id, skipping window");
                false
            }
            None => {
                warn!(schedule_id = %w.schedule_id, "Window has no known schedule, skipping");
                false
            }
        })
        .cloned()
        .collect()
}

fn checked_cadence(schedule: &Schedule) -> WorkerResult<Duration> {
    if schedule.frequency_days == 0 {
        return Err(WorkerError::invalid_schedule(format!(
            "schedule {} has a zero-day cadence",
            schedule.id
        )));
    }
    Ok(schedule.cadence())
}

/// `at + by`, rejecting the schedule when the instant is out of range.
fn shift(schedule: &Schedule, at: DateTime<Utc>, by: Duration) -> WorkerResult<DateTime<Utc>> {
    at.checked_add_signed(by).ok_or_else(|| {
        WorkerError::invalid_schedule(format!(
            "schedule {} steps past the representable date range ({} days cadence)",
            schedule.id, schedule.frequency_days
        ))
    })
}
