//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; the subscriber installed here
//! forwards those records into `tracing` so both end up in one stream.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Requests slower than this are logged at warn level
pub const SLOW_REQUEST: Duration = Duration::from_secs(1);

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use tourney_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log API request/response
pub fn log_api_request(
    request_id: Option<&str>,
    method: &str,
    path: &str,
    status_code: u16,
    elapsed: Duration,
) {
    let duration_ms = elapsed.as_millis() as u64;
    if elapsed > SLOW_REQUEST {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow request"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

/// Log a failed store call that a handler answered with a 503 or a fallback
pub fn log_store_failure(operation: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(operation = operation, error = %error, "Store unavailable");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_api_request() {
        // Just ensure it doesn't panic
        log_api_request(Some("abc"), "GET", "/api/v1/brackets/{id}", 200, Duration::from_millis(45));
        log_api_request(None, "POST", "/api/v1/brackets", 503, Duration::from_secs(2));
    }

    #[test]
    fn test_log_store_failure() {
        log_store_failure("create_bracket", &"connection refused");
    }
}
