//! Tournament format recommendations with historical learning.
//!
//! Provides:
//! - Rule-based format selection by team count
//! - Alternatives with warnings and a scheduling analysis
//! - Learning from operators' past choices for the same sport
//! - Acceptance statistics

pub mod engine;
pub mod errors;
pub mod manager;
pub mod models;
pub mod store;

pub use engine::LearnedPreference;
pub use errors::{RecommendError, RecommendResult};
pub use manager::{DEFAULT_HISTORY_WINDOW, FormatRecommender};
pub use models::{
    AlternativeFormat, ComplexityScores, DailyCapacity, FormatRecommendation, HistorySample,
    MatchCounts, NewRecommendation, Recommendation, RecommendationFactors, RecommendationId,
    RecommendationRecord, RecommendationStats, TournamentAnalysis, Verdict,
};
pub use store::{MemoryRecommendationStore, PgRecommendationStore, RecommendationStore};
