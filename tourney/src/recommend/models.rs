//! Recommendation data models.

use crate::bracket::EventId;
use crate::format::{BracketFormat, Complexity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommendation record ID type
pub type RecommendationId = i64;

/// The primary format suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecommendation {
    pub format: BracketFormat,
    pub matches: usize,
    pub rounds: u32,
    /// 0-100 heuristic certainty
    pub confidence: u8,
    pub description: String,
    pub reason: String,
    /// Whether past decisions changed the outcome
    pub learning_based: bool,
}

/// How a non-primary format compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AlsoGood,
    Alternative,
    NotRecommended,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::AlsoGood => "ALSO GOOD",
            Verdict::Alternative => "ALTERNATIVE",
            Verdict::NotRecommended => "NOT RECOMMENDED",
        }
    }
}

/// A format other than the primary recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeFormat {
    pub format: BracketFormat,
    pub verdict: Verdict,
    pub matches: usize,
    pub rounds: u32,
    pub warning: Option<String>,
    pub description: String,
}

/// Match count of every format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub single_elimination: usize,
    pub double_elimination: usize,
    pub round_robin: usize,
}

impl MatchCounts {
    pub fn for_teams(num_teams: usize) -> Self {
        Self {
            single_elimination: BracketFormat::SingleElimination.match_count(num_teams),
            double_elimination: BracketFormat::DoubleElimination.match_count(num_teams),
            round_robin: BracketFormat::RoundRobin.match_count(num_teams),
        }
    }
}

/// Complexity label of every format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScores {
    pub single_elimination: Complexity,
    pub double_elimination: Complexity,
    pub round_robin: Complexity,
}

impl ComplexityScores {
    pub fn for_teams(num_teams: usize) -> Self {
        Self {
            single_elimination: BracketFormat::SingleElimination.complexity(num_teams),
            double_elimination: BracketFormat::DoubleElimination.complexity(num_teams),
            round_robin: BracketFormat::RoundRobin.complexity(num_teams),
        }
    }
}

/// How many matches of a sport fit in one scheduling day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCapacity {
    pub max_matches_per_day: u32,
    pub match_duration_minutes: u32,
    pub sport_type: String,
}

/// Scheduling analysis attached to every recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentAnalysis {
    pub team_count: usize,
    pub match_counts: MatchCounts,
    pub daily_capacity: DailyCapacity,
    /// Days needed to play a full round robin
    pub estimated_days: u32,
    pub complexity: ComplexityScores,
}

/// Full answer to a recommendation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation: FormatRecommendation,
    pub alternatives: Vec<AlternativeFormat>,
    pub analysis: TournamentAnalysis,
}

/// Inputs captured with a stored recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFactors {
    pub team_count: usize,
    pub sport_type: String,
    pub confidence: u8,
    pub selected_teams: usize,
    pub timestamp: DateTime<Utc>,
}

/// Recommendation to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecommendation {
    pub event_id: EventId,
    pub sport_type: String,
    pub num_teams: usize,
    pub recommended_format: BracketFormat,
    pub confidence_score: u8,
    pub factors_considered: RecommendationFactors,
}

/// Persisted recommendation and, once decided, the operator's choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: RecommendationId,
    pub event_id: EventId,
    pub sport_type: String,
    pub num_teams: usize,
    pub recommended_format: BracketFormat,
    pub confidence_score: u8,
    pub factors_considered: RecommendationFactors,
    pub admin_choice: Option<BracketFormat>,
    pub matches_created: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecommendationRecord {
    pub fn is_decided(&self) -> bool {
        self.admin_choice.is_some()
    }
}

/// The part of a past record the learning step looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    pub num_teams: usize,
    pub recommended_format: BracketFormat,
    pub admin_choice: Option<BracketFormat>,
}

impl HistorySample {
    /// The operator's choice, or what was recommended if they never chose
    pub fn effective_format(&self) -> BracketFormat {
        self.admin_choice.unwrap_or(self.recommended_format)
    }
}

/// Aggregate acceptance statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total_recommendations: u64,
    pub admin_decisions: u64,
    pub accepted_recommendations: u64,
    pub avg_confidence: f64,
    /// `accepted / decisions`, 0 without decisions
    pub acceptance_rate: f64,
}

impl RecommendationStats {
    pub fn new(total: u64, decisions: u64, accepted: u64, avg_confidence: f64) -> Self {
        let acceptance_rate = if decisions == 0 {
            0.0
        } else {
            accepted as f64 / decisions as f64
        };
        Self {
            total_recommendations: total,
            admin_decisions: decisions,
            accepted_recommendations: accepted,
            avg_confidence,
            acceptance_rate,
        }
    }
}
