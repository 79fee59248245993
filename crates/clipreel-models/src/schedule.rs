//! Recurring compilation schedules.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScheduleId(pub i64);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ScheduleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A recurring compilation definition: one game category compiled every
/// `frequency_days` days starting at `start_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schedule {
    /// Schedule ID
    pub id: ScheduleId,

    /// Human-readable label
    #[serde(default)]
    pub label: String,

    /// Target game (category) ID in the clip catalog
    pub game_id: String,

    /// Preferred clip language, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// First instant covered by the schedule
    pub start_date: DateTime<Utc>,

    /// Cadence in whole days
    pub frequency_days: u32,

    /// Target compilation duration in seconds
    pub target_duration_seconds: u32,

    /// Longest individual clip accepted, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_time_max_seconds: Option<u32>,

    /// Whether one broadcaster may appear more than once per compilation
    #[serde(default = "default_repeat_broadcaster")]
    pub repeat_broadcaster: bool,
}

fn default_repeat_broadcaster() -> bool {
    true
}

impl Schedule {
    /// Create a schedule with default policy (repeats allowed, no clip cap).
    pub fn new(
        id: impl Into<ScheduleId>,
        game_id: impl Into<String>,
        start_date: DateTime<Utc>,
        frequency_days: u32,
        target_duration_seconds: u32,
    ) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            game_id: game_id.into(),
            language: None,
            start_date,
            frequency_days,
            target_duration_seconds,
            clip_time_max_seconds: None,
            repeat_broadcaster: true,
        }
    }

    /// Length of one window.
    pub fn cadence(&self) -> Duration {
        Duration::days(i64::from(self.frequency_days))
    }

    /// True if the schedule names a game to compile.
    pub fn has_game(&self) -> bool {
        !self.game_id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cadence() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let schedule = Schedule::new(ScheduleId(1), "509658", start, 7, 600);
        assert_eq!(schedule.cadence(), Duration::days(7));
        assert!(schedule.repeat_broadcaster);
    }

    #[test]
    fn test_has_game() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut schedule = Schedule::new(ScheduleId(1), "  ", start, 7, 600);
        assert!(!schedule.has_game());
        schedule.game_id = "32982".to_string();
        assert!(schedule.has_game());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "id": 4,
            "game_id": "21779",
            "start_date": "2024-03-01T00:00:00Z",
            "frequency_days": 1,
            "target_duration_seconds": 300
        }"#;
        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.id, ScheduleId(4));
        assert!(schedule.repeat_broadcaster);
        assert!(schedule.clip_time_max_seconds.is_none());
    }
}
