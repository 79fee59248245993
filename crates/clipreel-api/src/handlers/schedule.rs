//! Scheduling pass trigger.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use tracing::info;

use clipreel_worker::PassReport;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create missing windows and compile the due ones.
///
/// A second request while a pass is running is rejected rather than queued.
pub async fn schedule(State(state): State<AppState>) -> ApiResult<Json<PassReport>> {
    let _guard = state
        .pass_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("a scheduling pass is already running".into()))?;

    info!("Scheduling pass requested");
    let report = state.worker.schedule_pass().run(Utc::now()).await?;
    Ok(Json(report))
}
