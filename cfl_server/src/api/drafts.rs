//! Draft API handlers.
//!
//! REST endpoints for running a league draft:
//! - Starting a draft with an explicit or shuffled team order
//! - Reading the live snapshot and the pick log
//! - Submitting manual picks and forcing an auto-pick
//! - Pausing, resuming and resetting the auto-pick breaker
//!
//! # Examples
//!
//! Start a draft:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/leagues/1/draft \
//!   -H "Content-Type: application/json" \
//!   -d '{"order": [10, 20, 30]}'
//! ```
//!
//! Make a pick:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/leagues/1/draft/picks \
//!   -H "Content-Type: application/json" \
//!   -d '{"team_id": 10, "asset_id": 42}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use cfl_draft::draft::{
    DraftError, DraftPick, DraftSnapshot, DraftState, LeagueId, PickOutcome, PickSelection,
    TeamId,
};
use cfl_draft::guard::BreakerStatus;
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartDraftRequest {
    /// Explicit first-round order; shuffled when omitted
    #[serde(default)]
    pub order: Option<Vec<TeamId>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// HTTP status for a draft error
pub fn status_for(err: &DraftError) -> StatusCode {
    match err {
        DraftError::DraftNotFound(_) | DraftError::AssetNotFound(_) => StatusCode::NOT_FOUND,
        DraftError::DraftExists(_)
        | DraftError::NotInProgress(_)
        | DraftError::InvalidTransition { .. }
        | DraftError::NotYourTurn { .. }
        | DraftError::StalePick { .. }
        | DraftError::PickSuperseded(_)
        | DraftError::AlreadyDrafted { .. }
        | DraftError::PickInProgress(_)
        | DraftError::NoCandidates(_)
        | DraftError::ChannelClosed(_) => StatusCode::CONFLICT,
        DraftError::SlotFull { .. }
        | DraftError::NoSlotForAsset { .. }
        | DraftError::RosterFull(_)
        | DraftError::UnknownTeam(_)
        | DraftError::UnknownAssetType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DraftError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        DraftError::BreakerOpen { .. }
        | DraftError::RetriesExhausted(_)
        | DraftError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        DraftError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Stable machine-readable code for a draft error
pub fn error_code(err: &DraftError) -> &'static str {
    match err {
        DraftError::Database(_) => "database_error",
        DraftError::Timeout(_) => "timeout",
        DraftError::DraftNotFound(_) => "draft_not_found",
        DraftError::DraftExists(_) => "draft_exists",
        DraftError::NotInProgress(_) => "not_in_progress",
        DraftError::InvalidTransition { .. } => "invalid_transition",
        DraftError::NotYourTurn { .. } => "not_your_turn",
        DraftError::StalePick { .. } => "stale_pick",
        DraftError::PickSuperseded(_) => "pick_superseded",
        DraftError::AlreadyDrafted { .. } => "already_drafted",
        DraftError::SlotFull { .. } => "slot_full",
        DraftError::NoSlotForAsset { .. } => "no_slot_for_asset",
        DraftError::RosterFull(_) => "roster_full",
        DraftError::NoCandidates(_) => "no_candidates",
        DraftError::AssetNotFound(_) => "asset_not_found",
        DraftError::UnknownTeam(_) => "unknown_team",
        DraftError::UnknownAssetType(_) => "unknown_asset_type",
        DraftError::PickInProgress(_) => "pick_in_progress",
        DraftError::BreakerOpen { .. } => "breaker_open",
        DraftError::RetriesExhausted(_) => "retries_exhausted",
        DraftError::InvalidConfig(_) => "invalid_config",
        DraftError::ChannelClosed(_) => "draft_not_running",
    }
}

fn error_response(err: DraftError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Draft request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
            code: error_code(&err).to_string(),
        }),
    )
}

/// Create and start a league's draft.
///
/// # Response
///
/// Returns `201 Created` with the started draft state.
///
/// # Errors
///
/// - `400 Bad Request`: League has no teams or server draft defaults are invalid
/// - `409 Conflict`: League already has a draft
/// - `422 Unprocessable Entity`: Order names a team outside the league
pub async fn start_draft(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Json(request): Json<StartDraftRequest>,
) -> ApiResult<(StatusCode, Json<DraftState>)> {
    let draft = state
        .draft_manager
        .start_draft(league_id, request.order)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// Live draft snapshot: state, team on the clock, seconds left, breaker.
pub async fn get_draft(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<Json<DraftSnapshot>> {
    state
        .draft_manager
        .draft_state(league_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Picks made so far, in pick order.
pub async fn list_picks(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<Json<Vec<DraftPick>>> {
    state
        .draft_manager
        .list_picks(league_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Submit a manual pick for the team on the clock.
///
/// # Response
///
/// Returns `201 Created` with the recorded pick and updated state.
///
/// # Errors
///
/// - `404 Not Found`: Unknown asset
/// - `409 Conflict`: Not this team's turn, asset already drafted, draft not running
/// - `422 Unprocessable Entity`: No open roster slot for the asset's type
pub async fn make_pick(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
    Json(selection): Json<PickSelection>,
) -> ApiResult<(StatusCode, Json<PickOutcome>)> {
    let outcome = state
        .draft_manager
        .make_pick(league_id, selection)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Auto-pick for the team on the clock right now.
///
/// # Errors
///
/// - `503 Service Unavailable`: Breaker open or retries exhausted
pub async fn auto_pick(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<(StatusCode, Json<PickOutcome>)> {
    let outcome = state
        .draft_manager
        .auto_pick_now(league_id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn pause_draft(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<Json<DraftState>> {
    state
        .draft_manager
        .pause(league_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn resume_draft(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<Json<DraftState>> {
    state
        .draft_manager
        .resume(league_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Close the league's auto-pick breaker after an operator has fixed the cause.
pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(league_id): Path<LeagueId>,
) -> ApiResult<Json<BreakerStatus>> {
    state
        .draft_manager
        .reset_breaker(league_id)
        .await
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfl_draft::draft::DraftStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&DraftError::DraftNotFound(1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&DraftError::NotYourTurn {
                team_id: 1,
                on_clock: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&DraftError::BreakerOpen {
                league_id: 1,
                failures: 3
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&DraftError::NotInProgress(DraftStatus::Paused)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&DraftError::UnknownTeam(9)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_database_errors_are_hidden() {
        let (status, Json(body)) = error_response(DraftError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "database_error");
        assert!(!body.error.contains("pool"));
    }
}
