//! Leaderboard manager.

use super::aggregator::{Tallies, tally_bracket};
use super::models::{EventChampion, SportLeaderboard, TeamStanding};
use crate::bracket::{Bracket, BracketError, BracketId, BracketStore, EventId, compute_progress};
use log::warn;
use std::sync::Arc;
use thiserror::Error;

/// Leaderboard errors
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    #[error("Failed to load bracket data: {0}")]
    Load(#[from] BracketError),
}

impl LeaderboardError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LeaderboardError::Load(e) if e.is_transient())
    }

    pub fn client_message(&self) -> String {
        match self {
            LeaderboardError::Load(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

/// Read-only leaderboard views over the bracket store
#[derive(Clone)]
pub struct LeaderboardManager {
    store: Arc<dyn BracketStore>,
}

impl LeaderboardManager {
    pub fn new(store: Arc<dyn BracketStore>) -> Self {
        Self { store }
    }

    /// Ranked standings of one bracket
    pub async fn bracket_leaderboard(
        &self,
        bracket_id: BracketId,
    ) -> LeaderboardResult<Vec<TeamStanding>> {
        let bracket = self
            .store
            .find_bracket(bracket_id)
            .await?
            .ok_or(LeaderboardError::BracketNotFound(bracket_id))?;
        Ok(self.tally(&bracket).await?.ranked())
    }

    /// Event-wide standings summed across every sport
    pub async fn event_leaderboard(
        &self,
        event_id: EventId,
    ) -> LeaderboardResult<Vec<TeamStanding>> {
        let mut event = Tallies::default();
        for bracket in self.store.list_brackets(event_id).await? {
            event.absorb(&self.tally(&bracket).await?);
        }
        Ok(event.ranked())
    }

    /// One ranked table per sport of the event
    pub async fn sport_leaderboards(
        &self,
        event_id: EventId,
    ) -> LeaderboardResult<Vec<SportLeaderboard>> {
        let mut boards = Vec::new();
        for bracket in self.store.list_brackets(event_id).await? {
            let standings = self.tally(&bracket).await?.ranked();
            boards.push(SportLeaderboard {
                bracket_id: bracket.id,
                sport_type: bracket.sport_type,
                bracket_type: bracket.bracket_type,
                standings,
            });
        }
        Ok(boards)
    }

    /// Champions of the event's completed brackets
    pub async fn event_champions(
        &self,
        event_id: EventId,
    ) -> LeaderboardResult<Vec<EventChampion>> {
        let mut champions = Vec::new();
        for bracket in self.store.list_brackets(event_id).await? {
            let matches = self.store.load_matches(bracket.id).await?;
            let progress = compute_progress(bracket.bracket_type, bracket.id, &matches);
            if let Some(champion_team_id) = progress.champion_team_id {
                champions.push(EventChampion {
                    bracket_id: bracket.id,
                    sport_type: bracket.sport_type,
                    bracket_type: bracket.bracket_type,
                    champion_team_id,
                });
            }
        }
        Ok(champions)
    }

    /// [`event_leaderboard`](Self::event_leaderboard), empty on failure
    pub async fn event_leaderboard_or_empty(&self, event_id: EventId) -> Vec<TeamStanding> {
        self.event_leaderboard(event_id)
            .await
            .unwrap_or_else(|e| degrade("event leaderboard", event_id, e))
    }

    /// [`sport_leaderboards`](Self::sport_leaderboards), empty on failure
    pub async fn sport_leaderboards_or_empty(&self, event_id: EventId) -> Vec<SportLeaderboard> {
        self.sport_leaderboards(event_id)
            .await
            .unwrap_or_else(|e| degrade("sport leaderboards", event_id, e))
    }

    /// [`event_champions`](Self::event_champions), empty on failure
    pub async fn event_champions_or_empty(&self, event_id: EventId) -> Vec<EventChampion> {
        self.event_champions(event_id)
            .await
            .unwrap_or_else(|e| degrade("event champions", event_id, e))
    }

    async fn tally(&self, bracket: &Bracket) -> LeaderboardResult<Tallies> {
        let matches = self.store.load_matches(bracket.id).await?;
        Ok(tally_bracket(bracket.bracket_type, &matches))
    }
}

fn degrade<T>(view: &str, event_id: EventId, error: LeaderboardError) -> Vec<T> {
    warn!("Serving empty {view} for event {event_id}: {error}");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketManager, MatchResult, MemoryBracketStore, NewBracket};
    use crate::format::BracketFormat;

    async fn setup() -> (BracketManager, LeaderboardManager, Arc<MemoryBracketStore>) {
        let store = Arc::new(MemoryBracketStore::new());
        (
            BracketManager::new(store.clone()),
            LeaderboardManager::new(store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn test_event_leaderboard_across_sports() {
        let (brackets, leaderboard, _) = setup().await;

        for (sport, teams) in [("chess", vec![1, 2]), ("badminton", vec![2, 1])] {
            let summary = brackets
                .create_bracket(NewBracket {
                    event_id: 9,
                    sport_type: sport.to_string(),
                    bracket_type: BracketFormat::SingleElimination,
                    team_ids: teams.clone(),
                })
                .await
                .unwrap();
            let final_id = summary.rounds[0].matches[0].id;
            brackets
                .submit_result(
                    final_id,
                    MatchResult {
                        team1_score: if teams[0] == 2 { 2 } else { 1 },
                        team2_score: if teams[0] == 2 { 1 } else { 2 },
                        winner_team_id: 2,
                    },
                )
                .await
                .unwrap();
        }

        let standings = leaderboard.event_leaderboard(9).await.unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].team_id, 2);
        assert_eq!(standings[0].gold, 2);
        assert_eq!(standings[0].total_points, 6);
        assert_eq!(standings[0].win_rate, 100);
        assert_eq!(standings[1].silver, 2);
        assert_eq!(standings[1].win_rate, 0);

        let boards = leaderboard.sport_leaderboards(9).await.unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].sport_type, "chess");

        let champions = leaderboard.event_champions(9).await.unwrap();
        assert!(champions.iter().all(|c| c.champion_team_id == 2));
    }

    #[tokio::test]
    async fn test_unknown_event_is_empty() {
        let (_, leaderboard, _) = setup().await;
        assert!(leaderboard.event_leaderboard(404).await.unwrap().is_empty());
        assert!(matches!(
            leaderboard.bracket_leaderboard(404).await,
            Err(LeaderboardError::BracketNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_outage_degrades_to_empty() {
        let (brackets, leaderboard, store) = setup().await;
        brackets
            .create_bracket(NewBracket {
                event_id: 3,
                sport_type: "codm".to_string(),
                bracket_type: BracketFormat::RoundRobin,
                team_ids: vec![1, 2, 3],
            })
            .await
            .unwrap();

        store.set_offline(true);
        let err = leaderboard.event_leaderboard(3).await.unwrap_err();
        assert!(err.is_transient());
        assert!(leaderboard.event_leaderboard_or_empty(3).await.is_empty());
        assert!(leaderboard.event_champions_or_empty(3).await.is_empty());
        assert!(leaderboard.sport_leaderboards_or_empty(3).await.is_empty());
    }
}
