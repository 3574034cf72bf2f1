//! Schema initialization.
//!
//! Run [`ensure_schema`] once at process startup, before any store is used.
//! Request paths never create tables.

use log::info;
use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tournament_brackets (
        id BIGSERIAL PRIMARY KEY,
        event_id BIGINT NOT NULL,
        sport_type VARCHAR(100) NOT NULL,
        bracket_type VARCHAR(50) NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
        UNIQUE (event_id, sport_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id BIGSERIAL PRIMARY KEY,
        bracket_id BIGINT NOT NULL REFERENCES tournament_brackets(id) ON DELETE CASCADE,
        round_number INT NOT NULL,
        match_number INT NOT NULL,
        team1_id BIGINT,
        team2_id BIGINT,
        match_date TIMESTAMP,
        venue VARCHAR(255),
        team1_score INT,
        team2_score INT,
        winner_team_id BIGINT,
        status VARCHAR(20) NOT NULL DEFAULT 'scheduled',
        created_at TIMESTAMP NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
        UNIQUE (bracket_id, round_number, match_number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_matches_bracket ON matches (bracket_id)",
    r#"
    CREATE TABLE IF NOT EXISTS tournament_progress (
        bracket_id BIGINT PRIMARY KEY REFERENCES tournament_brackets(id) ON DELETE CASCADE,
        current_round INT NOT NULL DEFAULT 1,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        champion_team_id BIGINT,
        updated_at TIMESTAMP NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tournament_recommendations (
        id BIGSERIAL PRIMARY KEY,
        event_id BIGINT NOT NULL,
        sport_type VARCHAR(100) NOT NULL,
        num_teams INT NOT NULL,
        recommended_format VARCHAR(50) NOT NULL,
        confidence_score INT NOT NULL DEFAULT 0,
        factors_considered JSONB NOT NULL,
        admin_choice VARCHAR(50),
        matches_created INT NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_recommendations_event ON tournament_recommendations (event_id)",
    "CREATE INDEX IF NOT EXISTS idx_recommendations_sport ON tournament_recommendations (sport_type)",
    "CREATE INDEX IF NOT EXISTS idx_recommendations_teams ON tournament_recommendations (num_teams)",
];

/// Create every table and index used by the stores if absent.
///
/// Idempotent; the statements run inside one transaction.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema ready ({} statements)", STATEMENTS.len());
    Ok(())
}
