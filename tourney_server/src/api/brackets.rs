//! Bracket and match API handlers.
//!
//! # Examples
//!
//! Create a bracket:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/brackets \
//!   -H "Content-Type: application/json" \
//!   -d '{"event_id": 1, "sport_type": "chess", "bracket_type": "double_elimination", "team_ids": [4,8,15,16]}'
//! ```
//!
//! Submit a result:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches/3/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"team1_score": 2, "team2_score": 1, "winner_team_id": 4}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tourney::{
    Bracket, Match, MatchResult, NewBracket, TournamentProgress,
    bracket::{BracketId, BracketSummary, BracketUpdate, EventId, MatchId},
};

use super::AppState;
use super::errors::{ApiError, bracket_error};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub match_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
}

/// Generate a bracket and its matches for one sport of an event.
///
/// Teams are seeded in the order given. Byes are resolved before the
/// response is produced, so the summary already shows advanced teams.
///
/// # Errors
///
/// - `400 Bad Request`: Empty sport, fewer than two teams or duplicate teams
/// - `409 Conflict`: The event already has a bracket for this sport
pub async fn create_bracket(
    State(state): State<AppState>,
    Json(request): Json<NewBracket>,
) -> Result<(StatusCode, Json<BracketSummary>), ApiError> {
    let format = request.bracket_type;
    let summary = state
        .brackets
        .create_bracket(request)
        .await
        .map_err(|e| bracket_error("create_bracket", e))?;

    metrics::brackets_created_total(format);
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Bracket summary with its matches grouped by round.
///
/// # Errors
///
/// - `404 Not Found`: No such bracket
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> Result<Json<BracketSummary>, ApiError> {
    state
        .brackets
        .bracket_summary(bracket_id)
        .await
        .map(Json)
        .map_err(|e| bracket_error("get_bracket", e))
}

/// Brackets created for an event.
pub async fn list_event_brackets(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<Bracket>>, ApiError> {
    state
        .brackets
        .list_brackets(event_id)
        .await
        .map(Json)
        .map_err(|e| bracket_error("list_brackets", e))
}

/// Re-run progression over the stored matches and return the progress.
///
/// Safe to call at any time; an already consistent bracket is left as is.
pub async fn recompute(
    State(state): State<AppState>,
    Path(bracket_id): Path<BracketId>,
) -> Result<Json<TournamentProgress>, ApiError> {
    state
        .brackets
        .recompute_progress(bracket_id)
        .await
        .map(Json)
        .map_err(|e| bracket_error("recompute_progress", e))
}

/// Set the date and venue of a match that has not finished.
///
/// # Errors
///
/// - `400 Bad Request`: Blank venue
/// - `404 Not Found`: No such match
/// - `409 Conflict`: The match is already completed
pub async fn schedule_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Match>, ApiError> {
    state
        .brackets
        .schedule_match(match_id, request.match_date, request.venue)
        .await
        .map(Json)
        .map_err(|e| bracket_error("schedule_match", e))
}

/// Mark a match with both teams known as ongoing.
///
/// # Errors
///
/// - `404 Not Found`: No such match
/// - `409 Conflict`: The match is completed or still waiting for a team
pub async fn start_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<Match>, ApiError> {
    state
        .brackets
        .start_match(match_id)
        .await
        .map(Json)
        .map_err(|e| bracket_error("start_match", e))
}

/// Record a match result and advance the bracket.
///
/// Resubmitting the stored result of a completed match returns `200 OK`
/// with an empty `changed` list.
///
/// # Errors
///
/// - `400 Bad Request`: Negative score or a winner who did not play
/// - `404 Not Found`: No such match
/// - `409 Conflict`: Bye slot, match not ready, or a different result already recorded
pub async fn submit_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(result): Json<MatchResult>,
) -> Result<Json<BracketUpdate>, ApiError> {
    let update = state
        .brackets
        .submit_result(match_id, result)
        .await
        .map_err(|e| bracket_error("submit_result", e))?;

    let changed = !update.changed.is_empty();
    metrics::match_results_total(changed);
    if changed && update.progress.champion_team_id.is_some() {
        metrics::brackets_completed_total();
    }
    Ok(Json(update))
}
