//! Leaderboard data models.

use crate::bracket::{BracketId, TeamId};
use crate::format::BracketFormat;
use serde::{Deserialize, Serialize};

/// Points awarded per medal
pub const GOLD_POINTS: u32 = 3;
pub const SILVER_POINTS: u32 = 2;
pub const BRONZE_POINTS: u32 = 1;

/// Raw per-team counters, summable across brackets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    pub total_matches: u32,
    pub wins: u32,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

impl TeamTally {
    pub fn add(&mut self, other: &TeamTally) {
        self.total_matches += other.total_matches;
        self.wins += other.wins;
        self.gold += other.gold;
        self.silver += other.silver;
        self.bronze += other.bronze;
    }

    /// `3·gold + 2·silver + bronze`
    pub fn total_points(&self) -> u32 {
        GOLD_POINTS * self.gold + SILVER_POINTS * self.silver + BRONZE_POINTS * self.bronze
    }

    /// Percentage of matches won, clamped to `[0, 100]`
    pub fn win_rate(&self) -> u32 {
        if self.total_matches == 0 {
            return 0;
        }
        let rate = (f64::from(self.wins) * 100.0 / f64::from(self.total_matches)).round() as u32;
        rate.min(100)
    }
}

/// Ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    /// 1-based position
    pub rank: u32,
    pub team_id: TeamId,
    pub total_matches: u32,
    pub wins: u32,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub total_points: u32,
    pub win_rate: u32,
}

/// Leaderboard of one sport within an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportLeaderboard {
    pub bracket_id: BracketId,
    pub sport_type: String,
    pub bracket_type: BracketFormat,
    pub standings: Vec<TeamStanding>,
}

/// Champion of a completed bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChampion {
    pub bracket_id: BracketId,
    pub sport_type: String,
    pub bracket_type: BracketFormat,
    pub champion_team_id: TeamId,
}
