//! Compilation windows: one cadence-sized slice of a schedule.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ScheduleId;

/// Offset between a window's end and its release deadline.
pub const RELEASE_OFFSET: Duration = Duration::hours(12);

/// Lifecycle state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// No artifact yet
    #[default]
    Pending,
    /// Artifact location recorded
    Compiled,
    /// Artifact uploaded
    Uploaded,
}

impl WindowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowState::Pending => "pending",
            WindowState::Compiled => "compiled",
            WindowState::Uploaded => "uploaded",
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One instance of a schedule's cadence.
///
/// Windows of a schedule are contiguous: each window starts one second
/// after the previous window's end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Window {
    /// Owning schedule
    pub schedule_id: ScheduleId,

    /// First instant covered
    pub start: DateTime<Utc>,

    /// Last instant covered
    pub end: DateTime<Utc>,

    /// Release deadline (`end + RELEASE_OFFSET`)
    pub release: DateTime<Utc>,

    /// Where the compiled artifact lives, once compiled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_destination: Option<String>,

    /// Whether the artifact has been uploaded
    #[serde(default)]
    pub uploaded: bool,
}

impl Window {
    /// Create a pending window covering `[start, end]`.
    pub fn new(schedule_id: ScheduleId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            schedule_id,
            start,
            end,
            release: end + RELEASE_OFFSET,
            cache_destination: None,
            uploaded: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WindowState {
        match (&self.cache_destination, self.uploaded) {
            (_, true) => WindowState::Uploaded,
            (Some(_), false) => WindowState::Compiled,
            (None, false) => WindowState::Pending,
        }
    }

    /// True if no artifact has been recorded.
    pub fn is_pending(&self) -> bool {
        self.cache_destination.is_none()
    }

    /// Short label used in logs and errors.
    pub fn label(&self) -> String {
        format!(
            "schedule {} [{} .. {}]",
            self.schedule_id,
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Window {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap();
        Window::new(ScheduleId(1), start, end)
    }

    #[test]
    fn test_release_offset() {
        let window = sample();
        assert_eq!(window.release - window.end, Duration::hours(12));
    }

    #[test]
    fn test_state_transitions() {
        let mut window = sample();
        assert_eq!(window.state(), WindowState::Pending);
        assert!(window.is_pending());

        window.cache_destination = Some("work/abc/compilation.mp4".to_string());
        assert_eq!(window.state(), WindowState::Compiled);

        window.uploaded = true;
        assert_eq!(window.state(), WindowState::Uploaded);
    }

    #[test]
    fn test_label() {
        let window = sample();
        assert_eq!(
            window.label(),
            "schedule 1 [2024-01-01T00:00:00Z .. 2024-01-07T23:59:59Z]"
        );
    }
}
