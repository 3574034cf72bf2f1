//! HTTP API for the tournament server.
//!
//! Every endpoint is a synchronous JSON request/response over the library
//! managers held in [`AppState`].
//!
//! # Modules
//!
//! - [`recommendations`]: Format recommendations and admin decisions
//! - [`brackets`]: Bracket generation, match scheduling and results
//! - [`leaderboards`]: Medal standings and champions per event
//! - [`middleware`]: Request metrics
//! - [`request_id`]: Request id propagation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                  - Store health check
//! POST /api/v1/recommendations                  - Recommend and store
//! GET  /api/v1/recommendations/stats            - Acceptance statistics
//! GET  /api/v1/recommendations/{id}             - Stored recommendation
//! POST /api/v1/recommendations/{id}/choice      - Record admin choice
//! POST /api/v1/brackets                         - Create bracket and matches
//! GET  /api/v1/brackets/{id}                    - Bracket summary with matches
//! GET  /api/v1/brackets/{id}/leaderboard        - Bracket standings
//! POST /api/v1/brackets/{id}/recompute          - Recompute progress
//! POST /api/v1/matches/{id}/schedule            - Set date and venue
//! POST /api/v1/matches/{id}/start               - Mark match ongoing
//! POST /api/v1/matches/{id}/result              - Submit result
//! GET  /api/v1/events/{id}/brackets             - Brackets of an event
//! GET  /api/v1/events/{id}/leaderboard          - Event leaderboard
//! GET  /api/v1/events/{id}/leaderboard/sports   - Per-sport leaderboards
//! GET  /api/v1/events/{id}/champions            - Champions per sport
//! ```
//!
//! # Errors
//!
//! Failures are returned as `{"error": "..."}` with the status chosen by
//! [`errors`]: missing records are 404, rejected state transitions 409,
//! malformed input 400 and unreachable storage 503.

pub mod brackets;
pub mod errors;
pub mod leaderboards;
pub mod middleware;
pub mod recommendations;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tourney::{
    BracketManager, FormatRecommender, LeaderboardManager, MemoryBracketStore,
    MemoryRecommendationStore, bracket::BracketStore, recommend::RecommendationStore,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the managers sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub brackets: Arc<BracketManager>,
    pub leaderboards: Arc<LeaderboardManager>,
    pub recommender: Arc<FormatRecommender>,
}

impl AppState {
    /// Build the managers over the given stores
    pub fn new(
        bracket_store: Arc<dyn BracketStore>,
        recommendation_store: Arc<dyn RecommendationStore>,
        history_window: usize,
    ) -> Self {
        Self {
            brackets: Arc::new(BracketManager::new(bracket_store.clone())),
            leaderboards: Arc::new(LeaderboardManager::new(bracket_store)),
            recommender: Arc::new(
                FormatRecommender::new(recommendation_store).with_history_window(history_window),
            ),
        }
    }

    /// State over fresh in-memory stores
    pub fn in_memory(history_window: usize) -> Self {
        Self::new(
            Arc::new(MemoryBracketStore::new()),
            Arc::new(MemoryRecommendationStore::new()),
            history_window,
        )
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tourney_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = create_router(AppState::in_memory(50));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        // Route layer so the matched route template is known when recording
        .route_layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id::request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let recommendation_routes = Router::new()
        .route("/recommendations", post(recommendations::create_recommendation))
        .route("/recommendations/stats", get(recommendations::statistics))
        .route("/recommendations/{id}", get(recommendations::get_recommendation))
        .route(
            "/recommendations/{id}/choice",
            post(recommendations::record_choice),
        );

    let bracket_routes = Router::new()
        .route("/brackets", post(brackets::create_bracket))
        .route("/brackets/{id}", get(brackets::get_bracket))
        .route(
            "/brackets/{id}/leaderboard",
            get(leaderboards::bracket_leaderboard),
        )
        .route("/brackets/{id}/recompute", post(brackets::recompute))
        .route("/matches/{id}/schedule", post(brackets::schedule_match))
        .route("/matches/{id}/start", post(brackets::start_match))
        .route("/matches/{id}/result", post(brackets::submit_result));

    let event_routes = Router::new()
        .route("/events/{id}/brackets", get(brackets::list_event_brackets))
        .route(
            "/events/{id}/leaderboard",
            get(leaderboards::event_leaderboard),
        )
        .route(
            "/events/{id}/leaderboard/sports",
            get(leaderboards::sport_leaderboards),
        )
        .route("/events/{id}/champions", get(leaderboards::event_champions));

    Router::new()
        .merge(recommendation_routes)
        .merge(bracket_routes)
        .merge(event_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the bracket store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","store":true,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.brackets.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
