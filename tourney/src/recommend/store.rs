//! Recommendation persistence.

use super::errors::{RecommendError, RecommendResult};
use super::models::{
    HistorySample, NewRecommendation, RecommendationId, RecommendationRecord, RecommendationStats,
};
use crate::db::StoreError;
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::format::BracketFormat;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Storage of recommendation records
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn insert(&self, new: NewRecommendation) -> RecommendResult<RecommendationRecord>;

    async fn find(&self, id: RecommendationId) -> RecommendResult<Option<RecommendationRecord>>;

    /// Newest `limit` records for a sport, compared case-insensitively
    async fn recent_for_sport(
        &self,
        sport_type: &str,
        limit: usize,
    ) -> RecommendResult<Vec<HistorySample>>;

    /// Set the admin choice if none is recorded yet.
    ///
    /// Returns `None` when the record is missing or already decided.
    async fn record_choice(
        &self,
        id: RecommendationId,
        choice: BracketFormat,
        matches_created: usize,
    ) -> RecommendResult<Option<RecommendationRecord>>;

    async fn stats(&self) -> RecommendResult<RecommendationStats>;
}

/// PostgreSQL implementation of [`RecommendationStore`]
pub struct PgRecommendationStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PgRecommendationStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

const RECORD_COLUMNS: &str = "id, event_id, sport_type, num_teams, recommended_format, \
     confidence_score, factors_considered, admin_choice, matches_created, created_at, updated_at";

fn parse_format(label: &str) -> RecommendResult<BracketFormat> {
    label
        .parse()
        .map_err(|e: crate::format::UnknownFormat| StoreError::Corrupt(e.to_string()).into())
}

fn count(value: i32, column: &str) -> RecommendResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")).into())
}

fn record_from_row(row: &PgRow) -> RecommendResult<RecommendationRecord> {
    let recommended: String = row.get("recommended_format");
    let choice: Option<String> = row.get("admin_choice");
    let confidence: i32 = row.get("confidence_score");

    Ok(RecommendationRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        sport_type: row.get("sport_type"),
        num_teams: count(row.get("num_teams"), "num_teams")?,
        recommended_format: parse_format(&recommended)?,
        confidence_score: u8::try_from(confidence.clamp(0, 100)).unwrap_or(0),
        factors_considered: serde_json::from_value(row.get("factors_considered"))?,
        admin_choice: choice.as_deref().map(parse_format).transpose()?,
        matches_created: count(row.get("matches_created"), "matches_created")?,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn insert(&self, new: NewRecommendation) -> RecommendResult<RecommendationRecord> {
        let factors = serde_json::to_value(&new.factors_considered)?;
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "INSERT INTO tournament_recommendations \
                 (event_id, sport_type, num_teams, recommended_format, confidence_score, factors_considered) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING {RECORD_COLUMNS}"
            ))
            .bind(new.event_id)
            .bind(&new.sport_type)
            .bind(new.num_teams as i32)
            .bind(new.recommended_format.as_str())
            .bind(i32::from(new.confidence_score))
            .bind(factors)
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        record_from_row(&row)
    }

    async fn find(&self, id: RecommendationId) -> RecommendResult<Option<RecommendationRecord>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {RECORD_COLUMNS} FROM tournament_recommendations WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn recent_for_sport(
        &self,
        sport_type: &str,
        limit: usize,
    ) -> RecommendResult<Vec<HistorySample>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT num_teams, recommended_format, admin_choice
                 FROM tournament_recommendations
                 WHERE LOWER(sport_type) = LOWER($1)
                 ORDER BY created_at DESC, id DESC
                 LIMIT $2",
            )
            .bind(sport_type.trim())
            .bind(limit as i64)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter()
            .map(|row| {
                let recommended: String = row.get("recommended_format");
                let choice: Option<String> = row.get("admin_choice");
                Ok(HistorySample {
                    num_teams: count(row.get("num_teams"), "num_teams")?,
                    recommended_format: parse_format(&recommended)?,
                    admin_choice: choice.as_deref().map(parse_format).transpose()?,
                })
            })
            .collect()
    }

    async fn record_choice(
        &self,
        id: RecommendationId,
        choice: BracketFormat,
        matches_created: usize,
    ) -> RecommendResult<Option<RecommendationRecord>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "UPDATE tournament_recommendations
                 SET admin_choice = $1, matches_created = $2, updated_at = NOW()
                 WHERE id = $3 AND admin_choice IS NULL
                 RETURNING {RECORD_COLUMNS}"
            ))
            .bind(choice.as_str())
            .bind(matches_created as i32)
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn stats(&self) -> RecommendResult<RecommendationStats> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT
                    COUNT(*) AS total_recommendations,
                    COUNT(admin_choice) AS admin_decisions,
                    COUNT(*) FILTER (WHERE admin_choice = recommended_format) AS accepted_recommendations,
                    AVG(confidence_score)::FLOAT8 AS avg_confidence
                 FROM tournament_recommendations",
            )
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        let total: i64 = row.get("total_recommendations");
        let decisions: i64 = row.get("admin_decisions");
        let accepted: i64 = row.get("accepted_recommendations");
        let avg: Option<f64> = row.get("avg_confidence");

        Ok(RecommendationStats::new(
            total.max(0) as u64,
            decisions.max(0) as u64,
            accepted.max(0) as u64,
            avg.unwrap_or(0.0),
        ))
    }
}

/// In-memory [`RecommendationStore`] for tests and database-less runs
#[derive(Debug, Default)]
pub struct MemoryRecommendationStore {
    records: RwLock<Vec<RecommendationRecord>>,
    offline: AtomicBool,
}

impl MemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> RecommendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RecommendError::Store(StoreError::Timeout(Duration::ZERO)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecommendationStore for MemoryRecommendationStore {
    async fn insert(&self, new: NewRecommendation) -> RecommendResult<RecommendationRecord> {
        self.check_online()?;
        let mut records = self.records.write().await;
        let now = Utc::now();
        let record = RecommendationRecord {
            id: records.len() as RecommendationId + 1,
            event_id: new.event_id,
            sport_type: new.sport_type,
            num_teams: new.num_teams,
            recommended_format: new.recommended_format,
            confidence_score: new.confidence_score,
            factors_considered: new.factors_considered,
            admin_choice: None,
            matches_created: 0,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find(&self, id: RecommendationId) -> RecommendResult<Option<RecommendationRecord>> {
        self.check_online()?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn recent_for_sport(
        &self,
        sport_type: &str,
        limit: usize,
    ) -> RecommendResult<Vec<HistorySample>> {
        self.check_online()?;
        let sport = sport_type.trim().to_lowercase();
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.sport_type.to_lowercase() == sport)
            .take(limit)
            .map(|r| HistorySample {
                num_teams: r.num_teams,
                recommended_format: r.recommended_format,
                admin_choice: r.admin_choice,
            })
            .collect())
    }

    async fn record_choice(
        &self,
        id: RecommendationId,
        choice: BracketFormat,
        matches_created: usize,
    ) -> RecommendResult<Option<RecommendationRecord>> {
        self.check_online()?;
        let mut records = self.records.write().await;
        let Some(record) = records
            .iter_mut()
            .find(|r| r.id == id && r.admin_choice.is_none())
        else {
            return Ok(None);
        };
        record.admin_choice = Some(choice);
        record.matches_created = matches_created;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn stats(&self) -> RecommendResult<RecommendationStats> {
        self.check_online()?;
        let records = self.records.read().await;
        let total = records.len() as u64;
        let decisions = records.iter().filter(|r| r.is_decided()).count() as u64;
        let accepted = records
            .iter()
            .filter(|r| r.admin_choice == Some(r.recommended_format))
            .count() as u64;
        let avg = if records.is_empty() {
            0.0
        } else {
            records
                .iter()
                .map(|r| f64::from(r.confidence_score))
                .sum::<f64>()
                / records.len() as f64
        };
        Ok(RecommendationStats::new(total, decisions, accepted, avg))
    }
}
