//! Prometheus metrics for monitoring tournament server health and usage.
//!
//! Metrics are exposed in Prometheus text format for scraping by monitoring
//! systems when `METRICS_BIND` is set.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Tournament Metrics**: Recommendations, admin choices, brackets, results
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tourney_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/brackets", 201);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tourney::BracketFormat;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template so label cardinality stays bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Increment recommendations served, labelled by format and learning use.
pub fn recommendations_total(format: BracketFormat, learning_based: bool) {
    metrics::counter!("recommendations_total",
        "format" => format.to_string(),
        "learning_based" => learning_based.to_string()
    )
    .increment(1);
}

/// Increment admin decisions, labelled by whether they accepted the recommendation.
pub fn admin_choices_total(accepted: bool) {
    metrics::counter!("admin_choices_total",
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// Increment brackets created.
pub fn brackets_created_total(format: BracketFormat) {
    metrics::counter!("brackets_created_total",
        "format" => format.to_string()
    )
    .increment(1);
}

/// Increment accepted match results; `changed` is false for idempotent retries.
pub fn match_results_total(changed: bool) {
    metrics::counter!("match_results_total",
        "changed" => changed.to_string()
    )
    .increment(1);
}

/// Increment brackets that produced a champion.
pub fn brackets_completed_total() {
    metrics::counter!("brackets_completed_total").increment(1);
}

/// Increment store failures surfaced as 503 responses.
pub fn store_unavailable_total(operation: &str) {
    metrics::counter!("store_unavailable_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
