//! Prometheus metrics for monitoring draft health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **WebSocket Metrics**: Active connections
//! - **Draft Metrics**: Picks, auto-pick failures, breaker trips, active drafts
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cfl_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/leagues/{league_id}/draft/picks", 200);
//! ```

use cfl_draft::draft::{DraftEvent, DraftManager};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

pub fn websocket_connected() {
    metrics::gauge!("websocket_connections_active").increment(1.0);
    metrics::counter!("websocket_connections_total").increment(1);
}

pub fn websocket_disconnected() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

// ============================================================================
// Draft Metrics
// ============================================================================

/// Increment picks counter, labelled manual or auto.
pub fn picks_total(auto_pick: bool) {
    let kind = if auto_pick { "auto" } else { "manual" };
    metrics::counter!("draft_picks_total", "kind" => kind).increment(1);
}

pub fn autopick_failures_total() {
    metrics::counter!("draft_autopick_failures_total").increment(1);
}

pub fn breaker_trips_total() {
    metrics::counter!("draft_breaker_trips_total").increment(1);
}

/// Set current active drafts count.
pub fn active_drafts(count: usize) {
    metrics::gauge!("draft_active_drafts").set(count as f64);
}

/// Update counters for one draft event.
///
/// Returns true when the set of running drafts may have changed.
pub fn record_draft_event(event: &DraftEvent) -> bool {
    match event {
        DraftEvent::PickMade { pick, .. } => {
            picks_total(pick.auto_pick);
            false
        }
        DraftEvent::AutoPickFailed { .. } => {
            autopick_failures_total();
            false
        }
        DraftEvent::BreakerTripped { .. } => {
            breaker_trips_total();
            false
        }
        DraftEvent::DraftStarted { .. } | DraftEvent::DraftCompleted { .. } => true,
        _ => false,
    }
}

/// Spawn a task feeding draft metrics and logs from the manager's event stream.
pub fn spawn_draft_observer(manager: Arc<DraftManager>) -> JoinHandle<()> {
    let mut events = manager.events();
    tokio::spawn(async move {
        active_drafts(manager.active_draft_count().await);
        loop {
            match events.recv().await {
                Ok(event) => {
                    crate::logging::log_draft_event(&event);
                    if record_draft_event(&event) {
                        active_drafts(manager.active_draft_count().await);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Draft metrics observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfl_draft::draft::{AssetType, DraftPick, Position};

    #[test]
    fn test_record_draft_event_flags_lifecycle_changes() {
        let pick = DraftPick {
            league_id: 1,
            pick_number: 1,
            round: 1,
            team_id: 10,
            asset_type: AssetType::Brand,
            asset_id: 5,
            position: Position::Brand,
            auto_pick: true,
            picked_at: chrono::Utc::now(),
        };

        assert!(!record_draft_event(&DraftEvent::PickMade { league_id: 1, pick }));
        assert!(record_draft_event(&DraftEvent::DraftCompleted {
            league_id: 1,
            total_picks: 20,
        }));
        assert!(!record_draft_event(&DraftEvent::DraftPaused { league_id: 1 }));
    }
}
