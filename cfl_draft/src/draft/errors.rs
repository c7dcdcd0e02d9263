use super::models::{AssetId, AssetType, DraftStatus, LeagueId, Position, TeamId};
use crate::db::TimeoutError;
use thiserror::Error;

/// Draft errors
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    #[error("No draft for league {0}")]
    DraftNotFound(LeagueId),

    #[error("Draft for league {0} already exists")]
    DraftExists(LeagueId),

    #[error("Draft is {0}, not in progress")]
    NotInProgress(DraftStatus),

    #[error("Cannot move draft from {from} to {to}")]
    InvalidTransition { from: DraftStatus, to: DraftStatus },

    #[error("Team {team_id} is not on the clock (team {on_clock} is)")]
    NotYourTurn { team_id: TeamId, on_clock: TeamId },

    #[error("Stale pick: draft is at pick {current}, got pick {got}")]
    StalePick { current: u32, got: u32 },

    #[error("Pick {0} was already made")]
    PickSuperseded(u32),

    #[error("Asset {asset_id} is already on a roster in this league")]
    AlreadyDrafted { asset_id: AssetId },

    #[error("Team {team_id} has no open {position} slot")]
    SlotFull { team_id: TeamId, position: Position },

    #[error("No open slot for a {asset_type} on team {team_id}")]
    NoSlotForAsset {
        team_id: TeamId,
        asset_type: AssetType,
    },

    #[error("Roster for team {0} is full")]
    RosterFull(TeamId),

    #[error("No draftable assets left for team {0}")]
    NoCandidates(TeamId),

    #[error("Asset {0} not found")]
    AssetNotFound(AssetId),

    #[error("Team {0} is not part of this draft")]
    UnknownTeam(TeamId),

    #[error("Unknown asset type: {0}")]
    UnknownAssetType(String),

    #[error("A pick is already in progress for league {0}")]
    PickInProgress(LeagueId),

    #[error("Auto-pick disabled for league {league_id} after {failures} consecutive failures")]
    BreakerOpen { league_id: LeagueId, failures: u32 },

    #[error("Auto-pick gave up after {0} attempts")]
    RetriesExhausted(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Draft for league {0} is not running")]
    ChannelClosed(LeagueId),
}

impl DraftError {
    /// Message safe to show to clients (hides storage details)
    pub fn client_message(&self) -> String {
        match self {
            DraftError::Database(_) | DraftError::Timeout(_) => {
                "A server error occurred. Please try again".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether an auto-pick failure with this error counts against the league breaker.
    ///
    /// Contention and lifecycle outcomes (lock busy, pick already made, draft paused
    /// or finished, breaker already open) are not failures of the auto-pick itself.
    pub fn counts_as_autopick_failure(&self) -> bool {
        !matches!(
            self,
            DraftError::PickInProgress(_)
                | DraftError::PickSuperseded(_)
                | DraftError::NotInProgress(_)
                | DraftError::BreakerOpen { .. }
                | DraftError::DraftNotFound(_)
        )
    }
}

/// Draft result type
pub type DraftResult<T> = Result<T, DraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_database_details() {
        let err = DraftError::Database(sqlx::Error::PoolTimedOut);
        assert!(!err.client_message().contains("pool"));

        let err = DraftError::AlreadyDrafted { asset_id: 7 };
        assert_eq!(err.client_message(), "Asset 7 is already on a roster in this league");
    }

    #[test]
    fn test_breaker_accounting() {
        assert!(DraftError::NoCandidates(1).counts_as_autopick_failure());
        assert!(DraftError::RetriesExhausted(3).counts_as_autopick_failure());
        assert!(!DraftError::PickInProgress(1).counts_as_autopick_failure());
        assert!(!DraftError::NotInProgress(DraftStatus::Paused).counts_as_autopick_failure());
    }
}
