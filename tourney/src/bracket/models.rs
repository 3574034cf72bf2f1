//! Bracket, match and progress data models.

use crate::format::BracketFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event ID type (owned by the event collaborator)
pub type EventId = i64;

/// Bracket ID type
pub type BracketId = i64;

/// Match ID type
pub type MatchId = i64;

/// Team ID type (owned by the team collaborator)
pub type TeamId = i64;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting to be played
    Scheduled,
    /// In progress
    Ongoing,
    /// Decided, either played or resolved as a walkover
    Completed,
}

impl MatchStatus {
    /// Persisted label
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Completed => "completed",
        }
    }

    /// Parse a persisted label
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "scheduled" => Some(MatchStatus::Scheduled),
            "ongoing" => Some(MatchStatus::Ongoing),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

/// One sport's competition structure within an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    /// Bracket ID
    pub id: BracketId,
    /// Owning event
    pub event_id: EventId,
    /// Free-text sport, esport or activity code
    pub sport_type: String,
    /// Format the bracket was generated with
    pub bracket_type: BracketFormat,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp
    pub updated_at: DateTime<Utc>,
}

/// Request to generate a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBracket {
    pub event_id: EventId,
    pub sport_type: String,
    pub bracket_type: BracketFormat,
    /// Teams in seed order
    pub team_ids: Vec<TeamId>,
}

/// A match slot of a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID (0 until persisted)
    pub id: MatchId,
    /// Owning bracket (0 until persisted)
    pub bracket_id: BracketId,
    /// 1-based round, increasing toward the final
    pub round_number: u32,
    /// 1-based position within the round
    pub match_number: u32,
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub winner_team_id: Option<TeamId>,
    pub status: MatchStatus,
    pub match_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Create an empty slot that has not been persisted yet
    pub fn unsaved(round_number: u32, match_number: u32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            bracket_id: 0,
            round_number,
            match_number,
            team1_id: None,
            team2_id: None,
            team1_score: None,
            team2_score: None,
            winner_team_id: None,
            status: MatchStatus::Scheduled,
            match_date: None,
            venue: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Team in slot `side` (0 = team1, 1 = team2)
    pub fn team(&self, side: usize) -> Option<TeamId> {
        if side == 0 { self.team1_id } else { self.team2_id }
    }

    pub(crate) fn set_team(&mut self, side: usize, team_id: Option<TeamId>) {
        if side == 0 {
            self.team1_id = team_id;
        } else {
            self.team2_id = team_id;
        }
    }

    /// Whether both team slots are filled
    pub fn has_both_teams(&self) -> bool {
        self.team1_id.is_some() && self.team2_id.is_some()
    }

    /// Whether `team_id` occupies either slot
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team1_id == Some(team_id) || self.team2_id == Some(team_id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Completed without an opponent
    pub fn is_walkover(&self) -> bool {
        self.is_completed() && !self.has_both_teams()
    }

    /// Completed between two teams
    pub fn is_contested(&self) -> bool {
        self.is_completed() && self.has_both_teams()
    }

    /// Losing team of a played match
    pub fn loser(&self) -> Option<TeamId> {
        if !self.is_contested() {
            return None;
        }
        match self.winner_team_id {
            Some(w) if Some(w) == self.team1_id => self.team2_id,
            Some(w) if Some(w) == self.team2_id => self.team1_id,
            _ => None,
        }
    }

    /// Score scored by `team_id` and conceded to its opponent
    pub fn score_for(&self, team_id: TeamId) -> Option<(i32, i32)> {
        let (mine, theirs) = if self.team1_id == Some(team_id) {
            (self.team1_score, self.team2_score)
        } else if self.team2_id == Some(team_id) {
            (self.team2_score, self.team1_score)
        } else {
            return None;
        };
        Some((mine.unwrap_or(0), theirs.unwrap_or(0)))
    }

    pub(crate) fn complete_walkover(&mut self, winner: Option<TeamId>) {
        self.winner_team_id = winner;
        self.status = MatchStatus::Completed;
    }
}

/// Result submitted for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team1_score: i32,
    pub team2_score: i32,
    pub winner_team_id: TeamId,
}

/// Persisted summary of a bracket's matches
///
/// Always recomputable from the match set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentProgress {
    pub bracket_id: BracketId,
    /// Lowest round with an unresolved match, or the final round
    pub current_round: u32,
    pub is_completed: bool,
    /// Set only when `is_completed`
    pub champion_team_id: Option<TeamId>,
}

/// Matches of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundMatches {
    pub round_number: u32,
    pub matches: Vec<Match>,
}

/// Bracket read model with statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketSummary {
    pub bracket: Bracket,
    pub progress: TournamentProgress,
    pub total_matches: usize,
    pub completed_matches: usize,
    /// `round(completed / total * 100)`, 0 for an empty bracket
    pub completion_rate: u32,
    /// Distinct teams occupying any slot
    pub team_count: usize,
    pub rounds: Vec<RoundMatches>,
}

/// Outcome of a mutation applied to a bracket's match set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketUpdate {
    /// Match the operation targeted, after the update
    pub target: Option<Match>,
    /// Every match whose row changed, including the target
    pub changed: Vec<Match>,
    pub progress: TournamentProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(team1: TeamId, team2: TeamId, winner: TeamId) -> Match {
        let mut m = Match::unsaved(1, 1);
        m.team1_id = Some(team1);
        m.team2_id = Some(team2);
        m.team1_score = Some(3);
        m.team2_score = Some(1);
        m.winner_team_id = Some(winner);
        m.status = MatchStatus::Completed;
        m
    }

    #[test]
    fn test_status_labels() {
        for status in [
            MatchStatus::Scheduled,
            MatchStatus::Ongoing,
            MatchStatus::Completed,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MatchStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_loser_of_played_match() {
        let m = played(10, 20, 20);
        assert_eq!(m.loser(), Some(10));
        assert!(m.is_contested());
        assert!(!m.is_walkover());
    }

    #[test]
    fn test_walkover_has_no_loser() {
        let mut m = Match::unsaved(1, 3);
        m.team1_id = Some(5);
        m.complete_walkover(Some(5));
        assert!(m.is_walkover());
        assert_eq!(m.loser(), None);
    }

    #[test]
    fn test_score_for_each_side() {
        let m = played(10, 20, 10);
        assert_eq!(m.score_for(10), Some((3, 1)));
        assert_eq!(m.score_for(20), Some((1, 3)));
        assert_eq!(m.score_for(30), None);
    }
}
