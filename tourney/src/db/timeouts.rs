//! Database query timeout helpers
//!
//! Every store call goes through [`with_timeout`] so a stalled connection
//! surfaces as a transient failure instead of hanging a request.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a progression transaction (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted value violates the data model
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Execute a store operation with timeout
///
/// # Example
///
/// ```no_run
/// use tourney::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT * FROM tournament_brackets WHERE id = $1")
///         .bind(1_i64)
///         .fetch_optional(pool),
/// )
/// .await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}
