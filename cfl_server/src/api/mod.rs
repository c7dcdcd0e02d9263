//! HTTP/WebSocket API for the draft server.
//!
//! # Modules
//!
//! - [`drafts`]: Draft lifecycle and picks
//! - [`websocket`]: Live draft event stream
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                          - Health check
//! POST /api/v1/leagues/{league_id}/draft                - Start draft
//! GET  /api/v1/leagues/{league_id}/draft                - Draft snapshot
//! GET  /api/v1/leagues/{league_id}/draft/picks          - Pick log
//! POST /api/v1/leagues/{league_id}/draft/picks          - Manual pick
//! POST /api/v1/leagues/{league_id}/draft/autopick       - Auto-pick now
//! POST /api/v1/leagues/{league_id}/draft/pause          - Pause clock
//! POST /api/v1/leagues/{league_id}/draft/resume         - Resume clock
//! POST /api/v1/leagues/{league_id}/draft/breaker/reset  - Reset breaker
//! GET  /ws/drafts/{league_id}                           - Event stream
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cfl_draft::db::InMemoryDraftRepository;
//! use cfl_draft::draft::{DraftConfig, DraftManager};
//! use cfl_server::api::{create_router, AppState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryDraftRepository::new());
//! let manager = DraftManager::new(repo, DraftConfig::default());
//! let state = AppState {
//!     draft_manager: Arc::new(manager),
//!     database: None,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod drafts;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use cfl_draft::db::Database;
use cfl_draft::draft::DraftManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub draft_manager: Arc<DraftManager>,
    /// Backing database, probed by `/health`; `None` when running in memory
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws/drafts/{league_id}", get(websocket::websocket_handler))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/leagues/{league_id}/draft",
            post(drafts::start_draft).get(drafts::get_draft),
        )
        .route(
            "/leagues/{league_id}/draft/picks",
            get(drafts::list_picks).post(drafts::make_pick),
        )
        .route("/leagues/{league_id}/draft/autopick", post(drafts::auto_pick))
        .route("/leagues/{league_id}/draft/pause", post(drafts::pause_draft))
        .route("/leagues/{league_id}/draft/resume", post(drafts::resume_draft))
        .route(
            "/leagues/{league_id}/draft/breaker/reset",
            post(drafts::reset_breaker),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or none is configured),
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":true,"drafts":{"active_count":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let active_drafts = state.draft_manager.active_draft_count().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "drafts": {
            "active_count": active_drafts
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
