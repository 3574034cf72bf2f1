//! Bracket persistence.
//!
//! [`BracketStore`] abstracts the bracket, match and progress tables so the
//! manager can run against PostgreSQL in production and against
//! [`MemoryBracketStore`](super::memory::MemoryBracketStore) in tests.

use super::errors::{BracketError, BracketResult};
use super::models::{Bracket, BracketId, EventId, Match, MatchId, MatchStatus, TournamentProgress};
use crate::db::StoreError;
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::format::BracketFormat;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Change applied to a bracket's full match set inside one store transaction.
///
/// Receives the matches ordered by `(round_number, match_number)` and returns
/// the progress to persist. Returning an error aborts without writing.
pub type BracketMutation =
    Box<dyn FnOnce(&mut Vec<Match>) -> BracketResult<TournamentProgress> + Send>;

/// Result of a committed [`BracketMutation`]
#[derive(Debug, Clone)]
pub struct Mutated {
    /// Full match set after the mutation
    pub matches: Vec<Match>,
    /// Rows that were written
    pub changed: Vec<Match>,
    pub progress: TournamentProgress,
}

/// Persistence of brackets, matches and progress
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Insert a bracket with its matches and progress atomically.
    ///
    /// Fails with `DuplicateBracket` when the event already has a bracket
    /// for the sport.
    async fn insert_bracket(
        &self,
        event_id: EventId,
        sport_type: &str,
        bracket_type: BracketFormat,
        matches: Vec<Match>,
        progress: TournamentProgress,
    ) -> BracketResult<(Bracket, Vec<Match>, TournamentProgress)>;

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>>;

    /// Bracket owning a match
    async fn find_bracket_for_match(&self, match_id: MatchId) -> BracketResult<Option<Bracket>>;

    /// Brackets of an event, oldest first
    async fn list_brackets(&self, event_id: EventId) -> BracketResult<Vec<Bracket>>;

    /// Matches ordered by `(round_number, match_number)`
    async fn load_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>>;

    async fn load_progress(&self, bracket_id: BracketId)
    -> BracketResult<Option<TournamentProgress>>;

    /// Apply `mutation` to the bracket's match set while holding the
    /// bracket's progress row lock, then write changed matches and progress.
    async fn mutate_bracket(
        &self,
        bracket_id: BracketId,
        mutation: BracketMutation,
    ) -> BracketResult<Mutated>;

    /// Cheap liveness probe
    async fn ping(&self) -> BracketResult<()>;
}

/// Matches of `after` that differ from their counterpart in `before`
pub(crate) fn changed_matches(before: &[Match], after: &[Match]) -> BracketResult<Vec<Match>> {
    if before.len() != after.len() {
        return Err(BracketError::InvalidState(
            "A bracket mutation may not add or remove matches".to_string(),
        ));
    }
    let mut changed = Vec::new();
    for (old, new) in before.iter().zip(after) {
        if old.id != new.id {
            return Err(BracketError::InvalidState(
                "A bracket mutation may not reorder matches".to_string(),
            ));
        }
        if old != new {
            changed.push(new.clone());
        }
    }
    Ok(changed)
}

/// PostgreSQL implementation of [`BracketStore`]
pub struct PgBracketStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
    transaction_timeout: Duration,
}

impl PgBracketStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self.transaction_timeout = self.transaction_timeout.max(query_timeout);
        self
    }

    async fn within<T, F>(&self, future: F) -> BracketResult<T>
    where
        F: Future<Output = BracketResult<T>>,
    {
        match tokio::time::timeout(self.transaction_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.transaction_timeout).into()),
        }
    }
}

const BRACKET_COLUMNS: &str = "id, event_id, sport_type, bracket_type, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, bracket_id, round_number, match_number, team1_id, team2_id, \
     team1_score, team2_score, winner_team_id, status, match_date, venue, created_at, updated_at";

fn corrupt(message: String) -> BracketError {
    BracketError::Store(StoreError::Corrupt(message))
}

fn bracket_from_row(row: &PgRow) -> BracketResult<Bracket> {
    let bracket_type: String = row.get("bracket_type");
    Ok(Bracket {
        id: row.get("id"),
        event_id: row.get("event_id"),
        sport_type: row.get("sport_type"),
        bracket_type: bracket_type
            .parse()
            .map_err(|e: crate::format::UnknownFormat| corrupt(e.to_string()))?,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let round: i32 = row.get("round_number");
    let number: i32 = row.get("match_number");
    let status: String = row.get("status");
    Ok(Match {
        id: row.get("id"),
        bracket_id: row.get("bracket_id"),
        round_number: u32::try_from(round)
            .map_err(|_| corrupt(format!("negative round number {round}")))?,
        match_number: u32::try_from(number)
            .map_err(|_| corrupt(format!("negative match number {number}")))?,
        team1_id: row.get("team1_id"),
        team2_id: row.get("team2_id"),
        team1_score: row.get("team1_score"),
        team2_score: row.get("team2_score"),
        winner_team_id: row.get("winner_team_id"),
        status: MatchStatus::parse(&status)
            .ok_or_else(|| corrupt(format!("unknown match status '{status}'")))?,
        match_date: row
            .get::<Option<chrono::NaiveDateTime>, _>("match_date")
            .map(|d| d.and_utc()),
        venue: row.get("venue"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

fn progress_from_row(row: &PgRow) -> BracketResult<TournamentProgress> {
    let current_round: i32 = row.get("current_round");
    Ok(TournamentProgress {
        bracket_id: row.get("bracket_id"),
        current_round: u32::try_from(current_round)
            .map_err(|_| corrupt(format!("negative current round {current_round}")))?,
        is_completed: row.get("is_completed"),
        champion_team_id: row.get("champion_team_id"),
    })
}

async fn fetch_matches<'e, E: PgExecutor<'e>>(
    executor: E,
    bracket_id: BracketId,
) -> BracketResult<Vec<Match>> {
    let rows = sqlx::query(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE bracket_id = $1 \
         ORDER BY round_number, match_number"
    ))
    .bind(bracket_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(match_from_row).collect()
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn insert_bracket(
        &self,
        event_id: EventId,
        sport_type: &str,
        bracket_type: BracketFormat,
        matches: Vec<Match>,
        progress: TournamentProgress,
    ) -> BracketResult<(Bracket, Vec<Match>, TournamentProgress)> {
        self.within(async {
            let mut tx = self.pool.begin().await?;

            let inserted = sqlx::query(&format!(
                "INSERT INTO tournament_brackets (event_id, sport_type, bracket_type) \
                 VALUES ($1, $2, $3) RETURNING {BRACKET_COLUMNS}"
            ))
            .bind(event_id)
            .bind(sport_type)
            .bind(bracket_type.as_str())
            .fetch_one(&mut *tx)
            .await;

            let bracket = match inserted {
                Ok(row) => bracket_from_row(&row)?,
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(BracketError::DuplicateBracket {
                        event_id,
                        sport_type: sport_type.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            let mut saved = Vec::with_capacity(matches.len());
            for m in &matches {
                let row = sqlx::query(&format!(
                    "INSERT INTO matches (bracket_id, round_number, match_number, team1_id, \
                     team2_id, team1_score, team2_score, winner_team_id, status, match_date, venue) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {MATCH_COLUMNS}"
                ))
                .bind(bracket.id)
                .bind(m.round_number as i32)
                .bind(m.match_number as i32)
                .bind(m.team1_id)
                .bind(m.team2_id)
                .bind(m.team1_score)
                .bind(m.team2_score)
                .bind(m.winner_team_id)
                .bind(m.status.as_str())
                .bind(m.match_date.map(|d| d.naive_utc()))
                .bind(&m.venue)
                .fetch_one(&mut *tx)
                .await?;
                saved.push(match_from_row(&row)?);
            }

            let progress = TournamentProgress {
                bracket_id: bracket.id,
                ..progress
            };
            sqlx::query(
                "INSERT INTO tournament_progress (bracket_id, current_round, is_completed, champion_team_id) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(bracket.id)
            .bind(progress.current_round as i32)
            .bind(progress.is_completed)
            .bind(progress.champion_team_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok((bracket, saved, progress))
        })
        .await
    }

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {BRACKET_COLUMNS} FROM tournament_brackets WHERE id = $1"
            ))
            .bind(bracket_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(bracket_from_row).transpose()
    }

    async fn find_bracket_for_match(&self, match_id: MatchId) -> BracketResult<Option<Bracket>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT b.id, b.event_id, b.sport_type, b.bracket_type, b.created_at, b.updated_at
                 FROM tournament_brackets b
                 JOIN matches m ON m.bracket_id = b.id
                 WHERE m.id = $1",
            )
            .bind(match_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(bracket_from_row).transpose()
    }

    async fn list_brackets(&self, event_id: EventId) -> BracketResult<Vec<Bracket>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {BRACKET_COLUMNS} FROM tournament_brackets WHERE event_id = $1 ORDER BY id"
            ))
            .bind(event_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(bracket_from_row).collect()
    }

    async fn load_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>> {
        match tokio::time::timeout(
            self.query_timeout,
            fetch_matches(self.pool.as_ref(), bracket_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.query_timeout).into()),
        }
    }

    async fn load_progress(
        &self,
        bracket_id: BracketId,
    ) -> BracketResult<Option<TournamentProgress>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT bracket_id, current_round, is_completed, champion_team_id
                 FROM tournament_progress WHERE bracket_id = $1",
            )
            .bind(bracket_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn mutate_bracket(
        &self,
        bracket_id: BracketId,
        mutation: BracketMutation,
    ) -> BracketResult<Mutated> {
        self.within(async {
            let mut tx = self.pool.begin().await?;

            // Serializes progression of this bracket across processes
            let locked = sqlx::query(
                "SELECT bracket_id FROM tournament_progress WHERE bracket_id = $1 FOR UPDATE",
            )
            .bind(bracket_id)
            .fetch_optional(&mut *tx)
            .await?;
            if locked.is_none() {
                return Err(BracketError::BracketNotFound(bracket_id));
            }

            let before = fetch_matches(&mut *tx, bracket_id).await?;
            let mut matches = before.clone();
            let progress = mutation(&mut matches)?;
            let changed = changed_matches(&before, &matches)?;

            for m in &changed {
                sqlx::query(
                    "UPDATE matches SET team1_id = $1, team2_id = $2, team1_score = $3,
                         team2_score = $4, winner_team_id = $5, status = $6, match_date = $7,
                         venue = $8, updated_at = NOW()
                     WHERE id = $9",
                )
                .bind(m.team1_id)
                .bind(m.team2_id)
                .bind(m.team1_score)
                .bind(m.team2_score)
                .bind(m.winner_team_id)
                .bind(m.status.as_str())
                .bind(m.match_date.map(|d| d.naive_utc()))
                .bind(&m.venue)
                .bind(m.id)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                "UPDATE tournament_progress SET current_round = $1, is_completed = $2,
                     champion_team_id = $3, updated_at = NOW()
                 WHERE bracket_id = $4",
            )
            .bind(progress.current_round as i32)
            .bind(progress.is_completed)
            .bind(progress.champion_team_id)
            .bind(bracket_id)
            .execute(&mut *tx)
            .await?;

            if !changed.is_empty() {
                sqlx::query("UPDATE tournament_brackets SET updated_at = NOW() WHERE id = $1")
                    .bind(bracket_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(Mutated {
                matches,
                changed,
                progress,
            })
        })
        .await
    }

    async fn ping(&self) -> BracketResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }
}
