//! Multi-sport tournament server.
//!
//! Serves the recommendation, bracket and leaderboard API backed by
//! PostgreSQL, or by in-memory stores with `--memory`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;
use tourney::{
    PgBracketStore, PgRecommendationStore, bracket::BracketStore, db::Database,
    recommend::RecommendationStore,
};
use tourney_server::{
    api,
    config::{Overrides, ServerConfig, StorageBackend},
    logging, metrics,
};

const HELP: &str = "\
Run the multi-sport tournament server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep all data in process memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size [default: 20]
  QUERY_TIMEOUT_SECS       Per-query timeout [default: 5]
  METRICS_BIND             Prometheus scrape address, disabled when unset
  HISTORY_WINDOW           Past recommendations consulted per sport [default: 50]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs
            .opt_value_from_str::<_, SocketAddr>("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
        memory: pargs.contains("--memory"),
    };

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    logging::init();
    info!("Starting tournament server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exposed at http://{}/metrics", addr);
    }

    // Stop accepting requests on SIGINT/SIGTERM and let in-flight ones finish
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let (state, database) = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory stores; data is lost on exit");
            (api::AppState::in_memory(config.history_window), None)
        }
        StorageBackend::Postgres => {
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.ensure_schema()
                .await
                .context("Failed to create database schema")?;
            info!("Database connected and schema ready");

            let pool = Arc::new(db.pool().clone());
            let bracket_store: Arc<dyn BracketStore> = Arc::new(
                PgBracketStore::new(pool.clone()).with_query_timeout(db.query_timeout()),
            );
            let recommendation_store: Arc<dyn RecommendationStore> = Arc::new(
                PgRecommendationStore::new(pool).with_query_timeout(db.query_timeout()),
            );
            (
                api::AppState::new(bracket_store, recommendation_store, config.history_window),
                Some(db),
            )
        }
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    // An error means the sender is gone, which only happens at exit
    let _ = shutdown.wait_for(|stop| *stop).await;
}
