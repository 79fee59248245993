//! Compilation trigger.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use clipreel_models::TimeRange;
use clipreel_worker::{CompileRequest, SelectionPolicy};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Target compilation length when none is given.
pub const DEFAULT_TARGET_DURATION: u32 = 30;

/// Query parameters of `/process`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProcessParams {
    /// First day of the window, `YYYY-MM-DD`
    #[validate(length(min = 10, max = 10))]
    pub t1: String,
    /// Last day of the window, `YYYY-MM-DD`
    pub t2: Option<String>,
    /// Window length in days, used when `t2` is absent
    #[validate(range(min = 1, max = 366))]
    pub duration: Option<u32>,
    #[validate(length(min = 1, max = 64))]
    pub game_id: String,
    /// Seconds of footage to collect
    #[validate(range(min = 1, max = 86400))]
    pub target_duration: Option<u32>,
    /// Longest individual clip accepted, in seconds
    #[validate(range(min = 1))]
    pub clip_time_max: Option<u32>,
    pub repeat_broadcaster: Option<bool>,
}

impl ProcessParams {
    /// Resolve into a compile request.
    pub fn into_request(self) -> ApiResult<CompileRequest> {
        self.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let start = parse_day("t1", &self.t1)?;
        let end = match (&self.t2, self.duration) {
            (Some(t2), _) => parse_day("t2", t2)?,
            (None, Some(days)) => start + Duration::days(i64::from(days)),
            (None, None) => {
                return Err(ApiError::bad_request("t2 and duration cannot both be empty"))
            }
        };
        TimeRange::from_bounds(Some(start), Some(end))
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let mut policy =
            SelectionPolicy::new(self.target_duration.unwrap_or(DEFAULT_TARGET_DURATION));
        policy.repeat_broadcaster = self.repeat_broadcaster.unwrap_or(true);
        policy.clip_time_max = self.clip_time_max;

        Ok(CompileRequest::new(self.game_id.trim(), start, end, policy))
    }
}

fn parse_day(name: &str, value: &str) -> ApiResult<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::bad_request(format!("{name} must be a YYYY-MM-DD date, got {value:?}")))
}

/// Compile the requested window and return its process ID.
///
/// Runs to completion before responding.
pub async fn process(
    State(state): State<AppState>,
    params: Result<Query<ProcessParams>, QueryRejection>,
) -> ApiResult<Json<String>> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = params.into_request()?;
    info!(game_id = %request.game_id, window = %request.label, "Compilation requested");

    let result = state.worker.assembler.compile(request).await?;
    Ok(Json(result.process_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params() -> ProcessParams {
        ProcessParams {
            t1: "2024-03-01".into(),
            t2: None,
            duration: None,
            game_id: "509658".into(),
            target_duration: None,
            clip_time_max: None,
            repeat_broadcaster: None,
        }
    }

    #[test]
    fn test_duration_synthesizes_end() {
        let mut p = params();
        p.duration = Some(7);
        let request = p.into_request().unwrap();
        assert_eq!(request.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(request.end, Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap());
        assert_eq!(request.policy.target_seconds, 30);
        assert!(request.policy.repeat_broadcaster);
    }

    #[test]
    fn test_explicit_end_wins() {
        let mut p = params();
        p.t2 = Some("2024-03-03".into());
        p.duration = Some(30);
        p.target_duration = Some(600);
        p.repeat_broadcaster = Some(false);
        p.clip_time_max = Some(45);

        let request = p.into_request().unwrap();
        assert_eq!(request.end, Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(request.policy.target_seconds, 600);
        assert!(!request.policy.repeat_broadcaster);
        assert_eq!(request.policy.clip_time_max, Some(45));
    }

    #[test]
    fn test_missing_end_and_duration() {
        let err = params().into_request().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_bad_dates() {
        let mut p = params();
        p.t1 = "03/01/2024".into();
        p.duration = Some(7);
        assert!(p.into_request().is_err());

        let mut p = params();
        p.t2 = Some("2024-02-01".into());
        assert!(matches!(p.into_request().unwrap_err(), ApiError::BadRequest(_)));
    }

    #[test]
    fn test_validation() {
        let mut p = params();
        p.duration = Some(7);
        p.game_id = String::new();
        assert!(matches!(p.into_request().unwrap_err(), ApiError::Validation(_)));

        let mut p = params();
        p.duration = Some(0);
        assert!(matches!(p.into_request().unwrap_err(), ApiError::Validation(_)));
    }
}
