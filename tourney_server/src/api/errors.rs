//! Mapping of library errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tourney::{BracketError, LeaderboardError, RecommendError};

use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler's result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn respond(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

/// Record an unreachable store and answer 503
fn unavailable(operation: &str, error: &dyn std::fmt::Display, message: String) -> ApiError {
    logging::log_store_failure(operation, error);
    metrics::store_unavailable_total(operation);
    respond(StatusCode::SERVICE_UNAVAILABLE, message)
}

pub fn bracket_error(operation: &str, e: BracketError) -> ApiError {
    let status = match &e {
        BracketError::BracketNotFound(_) | BracketError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        BracketError::DuplicateBracket { .. } | BracketError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        BracketError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        BracketError::Store(_) => return unavailable(operation, &e, e.client_message()),
    };
    respond(status, e.client_message())
}

pub fn recommend_error(operation: &str, e: RecommendError) -> ApiError {
    let status = match &e {
        RecommendError::NotFound(_) => StatusCode::NOT_FOUND,
        RecommendError::AlreadyDecided(_) => StatusCode::CONFLICT,
        RecommendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RecommendError::Store(_) => return unavailable(operation, &e, e.client_message()),
    };
    respond(status, e.client_message())
}

pub fn leaderboard_error(operation: &str, e: LeaderboardError) -> ApiError {
    match e {
        LeaderboardError::Load(inner) => bracket_error(operation, inner),
        other @ LeaderboardError::BracketNotFound(_) => {
            respond(StatusCode::NOT_FOUND, other.client_message())
        }
    }
}
