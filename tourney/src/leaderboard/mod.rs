//! Medal leaderboards per bracket, per sport and per event.

pub mod aggregator;
pub mod manager;
pub mod models;

pub use aggregator::{Tallies, tally_bracket};
pub use manager::{LeaderboardError, LeaderboardManager, LeaderboardResult};
pub use models::{EventChampion, SportLeaderboard, TeamStanding, TeamTally};
