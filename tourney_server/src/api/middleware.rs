//! Request metrics middleware.
//!
//! Records a counter and a latency histogram for every request, labelled by
//! the matched route template rather than the raw path so ids do not blow up
//! label cardinality.
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use tourney_server::api::middleware::track_metrics;
//! # async fn handler() {}
//!
//! let app: Router = Router::new()
//!     .route("/api/v1/brackets/{id}", get(handler))
//!     .route_layer(middleware::from_fn(track_metrics));
//! # let _ = app;
//! ```

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::request_id::RequestId;
use crate::{logging, metrics};

/// Label used for requests that matched no route
const UNMATCHED: &str = "unmatched";

pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string());

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::http_requests_total(&method, &path, status);
    metrics::http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(request_id.as_deref(), &method, &path, status, elapsed);

    response
}
