//! Time filters for catalog clip queries.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of the window synthesized when only a start bound is given.
pub const OPEN_START_SPAN: Duration = Duration::days(7);

/// Errors constructing a time range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error("end {end} is before start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Time filter for a clip query, resolved once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeRange {
    /// No time filter.
    Unbounded,
    /// Start bound only; the end is `start + OPEN_START_SPAN`.
    OpenStart { start: DateTime<Utc> },
    /// Both bounds.
    Bounded {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeRange {
    /// Build a range from optional bounds.
    ///
    /// An end bound without a start bound is dropped: the catalog rejects
    /// half-open ranges in that direction.
    pub fn from_bounds(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, TimeRangeError> {
        match (start, end) {
            (None, _) => Ok(TimeRange::Unbounded),
            (Some(start), None) => Ok(TimeRange::OpenStart { start }),
            (Some(start), Some(end)) if end < start => {
                Err(TimeRangeError::EndBeforeStart { start, end })
            }
            (Some(start), Some(end)) => Ok(TimeRange::Bounded { start, end }),
        }
    }

    /// Concrete `(start, end)` bounds, or `None` when unbounded.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match *self {
            TimeRange::Unbounded => None,
            TimeRange::OpenStart { start } => Some((start, start + OPEN_START_SPAN)),
            TimeRange::Bounded { start, end } => Some((start, end)),
        }
    }

    /// Query parameters (`started_at`, `ended_at`) in RFC 3339 UTC.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self.bounds() {
            None => Vec::new(),
            Some((start, end)) => vec![
                (
                    "started_at",
                    start.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("ended_at", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        }
    }
}
