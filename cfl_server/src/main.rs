//! Draft server using the per-league actor model.
//!
//! Restores in-progress drafts from PostgreSQL, then serves the draft API
//! and event stream.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use cfl_draft::db::Database;
use cfl_draft::draft::DraftManager;
use cfl_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;

const HELP: &str = "\
Run the Cannabis Fantasy League draft server

USAGE:
  cfl_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  METRICS_BIND                 Prometheus scrape address (disabled when unset)
  DRAFT_SPEED                  slow | normal | fast
  DRAFT_PICK_TIMER_SECS        Seconds per pick, overrides DRAFT_SPEED
  DRAFT_AUTOPICK_MAX_ATTEMPTS  Auto-pick attempts per pick
  DRAFT_BREAKER_THRESHOLD      Failures before auto-pick is disabled
  DB_MAX_CONNECTIONS, DB_MIN_CONNECTIONS, DB_*_SECS   Pool sizing and timeouts
  ROSTER_<POSITION>_SLOTS      Roster limits (MANUFACTURER, STRAIN, PRODUCT, PHARMACY, BRAND, FLEX)
  A .env file in the working directory is loaded first
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

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Metrics exporter listening on {}", metrics_bind);
    }

    tracing::info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply schema")?;
    tracing::info!("Database connected successfully");

    let draft_config = config.draft_defaults.to_draft_config();
    tracing::info!(
        pick_timer_secs = draft_config.pick_timer_secs(),
        breaker_threshold = draft_config.breaker_threshold,
        "Draft defaults loaded"
    );

    let draft_manager = Arc::new(DraftManager::new(
        Arc::new(db.draft_repository()),
        draft_config,
    ));
    let observer = metrics::spawn_draft_observer(draft_manager.clone());

    let restored = draft_manager
        .restore_active_drafts()
        .await
        .context("Failed to restore drafts")?;
    tracing::info!("Restored {} in-progress draft(s)", restored);

    let api_state = api::AppState {
        draft_manager,
        database: Some(db.clone()),
    };
    let app = api::create_router(api_state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    observer.abort();
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
