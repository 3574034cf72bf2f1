//! Tournament formats and the per-format formulas every other module shares.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest roster accepted for a recommendation or an elimination bracket
pub const MAX_TEAMS: usize = 256;

/// Largest round-robin roster; 2016 matches
pub const MAX_ROUND_ROBIN_TEAMS: usize = 64;

/// Competition structure of a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketFormat {
    /// One loss eliminates a team
    SingleElimination,
    /// Winners and losers brackets; two losses eliminate a team
    DoubleElimination,
    /// Every team plays every other team once
    RoundRobin,
}

/// Relative organisational effort of running a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Low => "Low",
            Complexity::Medium => "Medium",
            Complexity::High => "High",
            Complexity::VeryHigh => "Very High",
        })
    }
}

/// Error returned when parsing an unknown format label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tournament format: {0}")]
pub struct UnknownFormat(pub String);

impl BracketFormat {
    /// Formats in the order alternatives are listed.
    pub const ALL: [BracketFormat; 3] = [
        BracketFormat::SingleElimination,
        BracketFormat::RoundRobin,
        BracketFormat::DoubleElimination,
    ];

    /// Persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketFormat::SingleElimination => "single_elimination",
            BracketFormat::DoubleElimination => "double_elimination",
            BracketFormat::RoundRobin => "round_robin",
        }
    }

    /// Number of contested matches needed for `num_teams` teams.
    ///
    /// Double elimination counts the grand-final reset.
    pub fn match_count(&self, num_teams: usize) -> usize {
        if num_teams < 2 {
            return 0;
        }
        match self {
            BracketFormat::SingleElimination => num_teams - 1,
            BracketFormat::DoubleElimination => 2 * num_teams - 1,
            BracketFormat::RoundRobin => num_teams * (num_teams - 1) / 2,
        }
    }

    /// Number of rounds for `num_teams` teams.
    ///
    /// Round robin is a single scheduling phase rather than sequential rounds.
    pub fn round_count(&self, num_teams: usize) -> u32 {
        match self {
            BracketFormat::SingleElimination => ceil_log2(num_teams),
            BracketFormat::DoubleElimination => ceil_log2(num_teams) * 2,
            BracketFormat::RoundRobin => 1,
        }
    }

    /// Complexity label for `num_teams` teams.
    pub fn complexity(&self, num_teams: usize) -> Complexity {
        match self {
            BracketFormat::SingleElimination if num_teams <= 16 => Complexity::Low,
            BracketFormat::SingleElimination => Complexity::Medium,
            BracketFormat::RoundRobin if num_teams <= 8 => Complexity::Low,
            BracketFormat::RoundRobin => Complexity::VeryHigh,
            BracketFormat::DoubleElimination if num_teams <= 8 => Complexity::Medium,
            BracketFormat::DoubleElimination => Complexity::High,
        }
    }

    /// Human-readable one-line description.
    pub fn description(&self, num_teams: usize) -> String {
        let matches = self.match_count(num_teams);
        let rounds = self.round_count(num_teams);
        match self {
            BracketFormat::SingleElimination => format!(
                "Single Elimination - Best for {num_teams} teams ({matches} matches, {rounds} rounds)"
            ),
            BracketFormat::DoubleElimination => {
                format!("Double Elimination - {matches} matches, {rounds} rounds")
            }
            BracketFormat::RoundRobin => format!("Round Robin - {matches} matches total"),
        }
    }

    /// Why an operator would pick this format.
    pub fn reason(&self, num_teams: usize) -> String {
        match self {
            BracketFormat::SingleElimination => format!(
                "Fastest option for {num_teams} teams. Quick elimination, minimum matches."
            ),
            BracketFormat::RoundRobin => {
                "Every team plays each other. Best for small groups up to 8 teams.".to_string()
            }
            BracketFormat::DoubleElimination => {
                "Teams get second chance. More matches but fairer results.".to_string()
            }
        }
    }

    /// Largest roster a bracket of this format may be generated for.
    pub fn max_teams(&self) -> usize {
        match self {
            BracketFormat::SingleElimination | BracketFormat::DoubleElimination => MAX_TEAMS,
            BracketFormat::RoundRobin => MAX_ROUND_ROBIN_TEAMS,
        }
    }

    /// Whether progression follows a winner-advances bracket.
    pub fn is_elimination(&self) -> bool {
        !matches!(self, BracketFormat::RoundRobin)
    }
}

impl fmt::Display for BracketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BracketFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(BracketFormat::SingleElimination),
            "double_elimination" => Ok(BracketFormat::DoubleElimination),
            "round_robin" => Ok(BracketFormat::RoundRobin),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// `ceil(log2(n))`, with 0 for `n <= 1`.
pub fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}
