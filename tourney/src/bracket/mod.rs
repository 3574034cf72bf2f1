//! Brackets, matches and the progression engine.
//!
//! Provides:
//! - Bracket layouts for single elimination, double elimination and round robin
//! - Automatic bye resolution and winner/loser propagation
//! - Progress and champion detection
//! - PostgreSQL and in-memory persistence behind [`BracketStore`]

pub mod errors;
pub mod layout;
pub mod manager;
pub mod memory;
pub mod models;
pub mod progression;
pub mod store;

pub use errors::{BracketError, BracketResult};
pub use layout::{BracketLayout, Section, Slot, Source};
pub use manager::BracketManager;
pub use memory::MemoryBracketStore;
pub use models::{
    Bracket, BracketId, BracketSummary, BracketUpdate, EventId, Match, MatchId, MatchResult,
    MatchStatus, NewBracket, RoundMatches, TeamId, TournamentProgress,
};
pub use progression::{Standing, advance, compute_progress, round_robin_standings};
pub use store::{BracketMutation, BracketStore, Mutated, PgBracketStore};
