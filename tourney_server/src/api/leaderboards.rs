//! Leaderboard API handlers.
//!
//! Event-level views are derived on every request from the stored matches.
//! When the store cannot be read they answer with empty lists rather than
//! an error.

use axum::{
    Json,
    extract::{Path, State},
};
use tourney::{
    TeamStanding,
    bracket::{BracketId, EventId},
    leaderboard::{EventChampion, SportLeaderboard},
};

use super::AppState;
use super::errors::{ApiError, leaderboard_error};

/// Ranked standings of a single bracket.
///
/// # Errors
///
/// - `404 Not Found`: No such bracket
/// - `503 Service Unavailable`: The bracket could not be loaded
pub async fn bracket_leaderboard(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> Result<Json<Vec<TeamStanding>>, ApiError> {
    state
        .leaderboards
        .bracket_leaderboard(bracket_id)
        .await
        .map(Json)
        .map_err(|e| leaderboard_error("bracket_leaderboard", e))
}

/// Medal and win standings across every bracket of an event.
pub async fn event_leaderboard(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Json<Vec<TeamStanding>> {
    Json(state.leaderboards.event_leaderboard_or_empty(event_id).await)
}

/// One leaderboard per sport of an event.
pub async fn sport_leaderboards(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Json<Vec<SportLeaderboard>> {
    Json(state.leaderboards.sport_leaderboards_or_empty(event_id).await)
}

/// Champion of every completed bracket of an event.
pub async fn event_champions(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Json<Vec<EventChampion>> {
    Json(state.leaderboards.event_champions_or_empty(event_id).await)
}
