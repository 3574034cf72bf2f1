use super::models::RecommendationId;
use crate::db::StoreError;
use thiserror::Error;

/// Recommendation errors
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Recommendation not found: {0}")]
    NotFound(RecommendationId),

    #[error("Recommendation {0} already has an admin choice")]
    AlreadyDecided(RecommendationId),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

impl RecommendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RecommendError::Store(_))
    }

    /// Client-safe message that does not leak store internals
    pub fn client_message(&self) -> String {
        match self {
            RecommendError::Store(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for RecommendError {
    fn from(err: sqlx::Error) -> Self {
        RecommendError::Store(StoreError::Database(err))
    }
}

impl From<serde_json::Error> for RecommendError {
    fn from(err: serde_json::Error) -> Self {
        RecommendError::Store(StoreError::Serialization(err))
    }
}

pub type RecommendResult<T> = Result<T, RecommendError>;
