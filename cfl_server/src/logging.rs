//! Structured logging configuration.
//!
//! The draft library logs through the `log` facade; the subscriber installed
//! here bridges those records into `tracing` so both end up in one stream.

use cfl_draft::draft::DraftEvent;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use cfl_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a draft event with structured fields
pub fn log_draft_event(event: &DraftEvent) {
    match event {
        DraftEvent::PickMade { league_id, pick } => tracing::info!(
            league_id = league_id,
            pick_number = pick.pick_number,
            team_id = pick.team_id,
            asset_id = pick.asset_id,
            auto_pick = pick.auto_pick,
            "Pick made"
        ),
        DraftEvent::AutoPickFailed {
            league_id,
            pick_number,
            reason,
        } => tracing::warn!(
            league_id = league_id,
            pick_number = pick_number,
            reason = %reason,
            "Auto-pick failed"
        ),
        DraftEvent::BreakerTripped {
            league_id,
            failures,
        } => tracing::error!(
            league_id = league_id,
            failures = failures,
            "Auto-pick breaker tripped"
        ),
        other => tracing::debug!(league_id = other.league_id(), event = ?other, "Draft event"),
    }
}

/// Log API request/response
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if status_code >= 500 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
