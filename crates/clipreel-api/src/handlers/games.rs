//! Game directory refresh.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use clipreel_models::Game;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopGamesParams {
    pub cap: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TopGamesResponse {
    pub refreshed: usize,
    pub known: usize,
    pub games: Vec<Game>,
}

/// Merge the catalog's current top games into the game directory.
pub async fn top_games(
    State(state): State<AppState>,
    Query(params): Query<TopGamesParams>,
) -> ApiResult<Json<TopGamesResponse>> {
    let cap = params.cap.unwrap_or(100).clamp(1, 500);
    let games = state
        .worker
        .games
        .refresh_top(state.worker.catalog.as_ref(), cap)
        .await?;

    Ok(Json(TopGamesResponse {
        refreshed: games.len(),
        known: state.worker.games.len().await,
        games,
    }))
}
