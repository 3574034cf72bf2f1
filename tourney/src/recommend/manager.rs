//! Format recommender: the engine wired to its history store.

use super::engine;
use super::errors::{RecommendError, RecommendResult};
use super::models::{
    FormatRecommendation, NewRecommendation, Recommendation, RecommendationFactors,
    RecommendationId, RecommendationRecord, RecommendationStats,
};
use super::store::RecommendationStore;
use crate::bracket::{EventId, TeamId};
use crate::format::{BracketFormat, MAX_TEAMS};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Number of most recent records per sport the learning step considers
pub const DEFAULT_HISTORY_WINDOW: usize = 50;

/// Format recommender
#[derive(Clone)]
pub struct FormatRecommender {
    store: Arc<dyn RecommendationStore>,
    history_window: usize,
}

impl FormatRecommender {
    pub fn new(store: Arc<dyn RecommendationStore>) -> Self {
        Self {
            store,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Override how many past records are considered
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    /// Recommend a format for the selected teams.
    ///
    /// Read-only. An unreachable history store degrades to the plain
    /// heuristic instead of failing.
    pub async fn recommend(
        &self,
        sport_type: &str,
        team_ids: &[TeamId],
    ) -> RecommendResult<Recommendation> {
        let sport_type = validate(sport_type, team_ids)?;
        let num_teams = team_ids.len();

        let history = if engine::special_case(num_teams).is_some() {
            Vec::new()
        } else {
            match self
                .store
                .recent_for_sport(sport_type, self.history_window)
                .await
            {
                Ok(history) => history,
                Err(e) => {
                    warn!("Recommendation history for '{sport_type}' unavailable, using heuristic: {e}");
                    Vec::new()
                }
            }
        };

        let recommendation = engine::recommend(num_teams, sport_type, &history);
        debug!(
            "Recommended {} for {} teams of {} (confidence {}, learning {})",
            recommendation.recommendation.format,
            num_teams,
            sport_type,
            recommendation.recommendation.confidence,
            recommendation.recommendation.learning_based
        );
        Ok(recommendation)
    }

    /// Persist a recommendation so the operator's choice can be recorded later
    pub async fn store_recommendation(
        &self,
        event_id: EventId,
        sport_type: &str,
        team_ids: &[TeamId],
        recommendation: &FormatRecommendation,
    ) -> RecommendResult<RecommendationRecord> {
        let sport_type = validate(sport_type, team_ids)?;
        let record = self
            .store
            .insert(NewRecommendation {
                event_id,
                sport_type: sport_type.to_string(),
                num_teams: team_ids.len(),
                recommended_format: recommendation.format,
                confidence_score: recommendation.confidence,
                factors_considered: RecommendationFactors {
                    team_count: team_ids.len(),
                    sport_type: sport_type.to_string(),
                    confidence: recommendation.confidence,
                    selected_teams: team_ids.len(),
                    timestamp: Utc::now(),
                },
            })
            .await?;

        info!(
            "Stored recommendation {} for event {}: {} ({}%)",
            record.id, event_id, record.recommended_format, record.confidence_score
        );
        Ok(record)
    }

    /// Recommend and persist in one call
    pub async fn recommend_and_store(
        &self,
        event_id: EventId,
        sport_type: &str,
        team_ids: &[TeamId],
    ) -> RecommendResult<(Recommendation, RecommendationRecord)> {
        let recommendation = self.recommend(sport_type, team_ids).await?;
        let record = self
            .store_recommendation(
                event_id,
                sport_type,
                team_ids,
                &recommendation.recommendation,
            )
            .await?;
        Ok((recommendation, record))
    }

    /// Record the operator's final format; allowed once per record
    pub async fn record_admin_choice(
        &self,
        id: RecommendationId,
        choice: BracketFormat,
    ) -> RecommendResult<RecommendationRecord> {
        let record = self
            .store
            .find(id)
            .await?
            .ok_or(RecommendError::NotFound(id))?;
        if record.is_decided() {
            return Err(RecommendError::AlreadyDecided(id));
        }

        let matches_created = choice.match_count(record.num_teams);
        match self.store.record_choice(id, choice, matches_created).await? {
            Some(updated) => {
                info!(
                    "Recommendation {} decided: {} (recommended {})",
                    id, choice, updated.recommended_format
                );
                Ok(updated)
            }
            // Lost a race with a concurrent decision
            None => Err(RecommendError::AlreadyDecided(id)),
        }
    }

    pub async fn get_record(&self, id: RecommendationId) -> RecommendResult<RecommendationRecord> {
        self.store
            .find(id)
            .await?
            .ok_or(RecommendError::NotFound(id))
    }

    /// Acceptance statistics over every stored recommendation
    pub async fn statistics(&self) -> RecommendResult<RecommendationStats> {
        self.store.stats().await
    }

    /// [`statistics`](Self::statistics), zeroed on failure
    pub async fn statistics_or_default(&self) -> RecommendationStats {
        self.statistics().await.unwrap_or_else(|e| {
            warn!("Recommendation statistics unavailable: {e}");
            RecommendationStats::new(0, 0, 0, 0.0)
        })
    }
}

fn validate<'a>(sport_type: &'a str, team_ids: &[TeamId]) -> RecommendResult<&'a str> {
    let sport_type = sport_type.trim();
    if sport_type.is_empty() {
        return Err(RecommendError::InvalidInput(
            "Sport type is required".to_string(),
        ));
    }
    if team_ids.len() < 2 {
        return Err(RecommendError::InvalidInput(format!(
            "At least 2 teams are required, got {}",
            team_ids.len()
        )));
    }
    if team_ids.len() > MAX_TEAMS {
        return Err(RecommendError::InvalidInput(format!(
            "At most {MAX_TEAMS} teams are supported, got {}",
            team_ids.len()
        )));
    }
    let unique: HashSet<&TeamId> = team_ids.iter().collect();
    if unique.len() != team_ids.len() {
        return Err(RecommendError::InvalidInput(
            "Selected teams must be unique".to_string(),
        ));
    }
    Ok(sport_type)
}
