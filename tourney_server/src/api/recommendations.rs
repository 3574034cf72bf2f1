//! Format recommendation API handlers.
//!
//! # Examples
//!
//! Request a recommendation:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/recommendations \
//!   -H "Content-Type: application/json" \
//!   -d '{"event_id": 1, "sport_type": "basketball", "team_ids": [1,2,3,4,5,6,7,8]}'
//! ```
//!
//! Record the format the operator went with:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/recommendations/12/choice \
//!   -H "Content-Type: application/json" \
//!   -d '{"format": "round_robin"}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tourney::{
    BracketFormat, Recommendation,
    bracket::{EventId, TeamId},
    recommend::{RecommendationId, RecommendationRecord, RecommendationStats},
};

use super::AppState;
use super::errors::{ApiError, recommend_error};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub event_id: EventId,
    pub sport_type: String,
    pub team_ids: Vec<TeamId>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    /// Id to quote when recording the admin choice; `null` when the
    /// recommendation could not be stored
    pub id: Option<RecommendationId>,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub format: BracketFormat,
}

/// Recommend a format for the selected teams and store the recommendation.
///
/// Returns `201 Created` with the recommendation, its alternatives, the
/// tournament analysis and the stored record id. When the store is
/// unreachable the recommendation is still answered with `200 OK` and a
/// `null` id, since no choice can be recorded against it.
///
/// # Errors
///
/// - `400 Bad Request`: Empty sport, too few or too many teams, or duplicate teams
pub async fn create_recommendation(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<(StatusCode, Json<RecommendationResponse>), ApiError> {
    const OPERATION: &str = "create_recommendation";

    let recommendation = state
        .recommender
        .recommend(&request.sport_type, &request.team_ids)
        .await
        .map_err(|e| recommend_error(OPERATION, e))?;

    let primary = &recommendation.recommendation;
    metrics::recommendations_total(primary.format, primary.learning_based);

    let stored = state
        .recommender
        .store_recommendation(
            request.event_id,
            &request.sport_type,
            &request.team_ids,
            primary,
        )
        .await;

    let (status, id) = match stored {
        Ok(record) => (StatusCode::CREATED, Some(record.id)),
        Err(e) if e.is_transient() => {
            logging::log_store_failure(OPERATION, &e);
            metrics::store_unavailable_total(OPERATION);
            (StatusCode::OK, None)
        }
        Err(e) => return Err(recommend_error(OPERATION, e)),
    };

    Ok((status, Json(RecommendationResponse { id, recommendation })))
}

/// Fetch a stored recommendation record.
///
/// # Errors
///
/// - `404 Not Found`: No such recommendation
pub async fn get_recommendation(
    State(state): State<AppState>,
    Path(id): Path<RecommendationId>,
) -> Result<Json<RecommendationRecord>, ApiError> {
    state
        .recommender
        .get_record(id)
        .await
        .map(Json)
        .map_err(|e| recommend_error("get_recommendation", e))
}

/// Record the format the operator chose for a recommendation.
///
/// The decision is final; the record's `matches_created` is set from the
/// chosen format and team count.
///
/// # Errors
///
/// - `404 Not Found`: No such recommendation
/// - `409 Conflict`: A choice was already recorded
pub async fn record_choice(
    State(state): State<AppState>,
    Path(id): Path<RecommendationId>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<RecommendationRecord>, ApiError> {
    let record = state
        .recommender
        .record_admin_choice(id, request.format)
        .await
        .map_err(|e| recommend_error("record_choice", e))?;

    metrics::admin_choices_total(record.admin_choice == Some(record.recommended_format));
    Ok(Json(record))
}

/// Acceptance statistics over every stored recommendation.
///
/// Zeroed when the store cannot be read.
pub async fn statistics(State(state): State<AppState>) -> Json<RecommendationStats> {
    Json(state.recommender.statistics_or_default().await)
}
