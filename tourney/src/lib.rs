//! # Tourney
//!
//! Core of a multi-sport tournament system: bracket generation, match
//! progression, medal leaderboards and tournament format recommendations.
//!
//! ## Architecture
//!
//! Brackets are described by a slot graph ([`bracket::BracketLayout`]) in
//! which every match slot names where its two teams come from. The
//! progression engine walks that graph whenever a result arrives, moving
//! winners forward, dropping losers into the losers bracket and resolving
//! byes as walkovers. Progress and leaderboards are always derived from the
//! stored matches, so recomputing them is safe at any time.
//!
//! ## Core Modules
//!
//! - [`format`]: Tournament formats and their match/round formulas
//! - [`bracket`]: Bracket layouts, progression engine and bracket manager
//! - [`leaderboard`]: Medal and win standings per bracket, sport and event
//! - [`recommend`]: Format recommendation engine with historical learning
//! - [`db`]: PostgreSQL pool, schema bootstrap and query timeouts
//!
//! ## Example
//!
//! ```
//! use tourney::{BracketFormat, BracketLayout};
//!
//! let layout = BracketLayout::build(BracketFormat::DoubleElimination, 8).unwrap();
//! assert_eq!(layout.contested_count(), BracketFormat::DoubleElimination.match_count(8));
//! ```

/// Brackets, matches and the progression engine.
pub mod bracket;
pub use bracket::{
    Bracket, BracketError, BracketLayout, BracketManager, BracketResult, BracketStore, Match,
    MatchResult, MatchStatus, MemoryBracketStore, NewBracket, PgBracketStore, TournamentProgress,
};

/// Database connection pool and schema.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Tournament formats.
pub mod format;
pub use format::{BracketFormat, Complexity};

/// Medal leaderboards.
pub mod leaderboard;
pub use leaderboard::{LeaderboardError, LeaderboardManager, TeamStanding};

/// Format recommendations.
pub mod recommend;
pub use recommend::{
    FormatRecommender, MemoryRecommendationStore, PgRecommendationStore, RecommendError,
    Recommendation,
};
