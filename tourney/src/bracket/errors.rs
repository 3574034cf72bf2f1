//! Bracket error types.

use super::models::{BracketId, EventId, MatchId};
use crate::db::StoreError;
use thiserror::Error;

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("A bracket for sport '{sport_type}' already exists in event {event_id}")]
    DuplicateBracket {
        event_id: EventId,
        sport_type: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

impl BracketError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BracketError::Store(_))
    }

    /// Client-safe message that does not leak store internals
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Store(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for BracketError {
    fn from(err: sqlx::Error) -> Self {
        BracketError::Store(StoreError::Database(err))
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
