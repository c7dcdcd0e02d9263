//! Draft actor message types.

use super::{
    autopick::PickOutcome,
    errors::DraftResult,
    models::{DraftPick, LeagueId, TeamId},
    state::DraftState,
};
use crate::guard::BreakerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Messages handled by a draft actor
#[derive(Debug)]
pub enum DraftMessage {
    /// A manual pick was committed; refresh and broadcast
    PickRecorded { outcome: Box<PickOutcome> },

    /// Run an auto-pick for the team on the clock now
    AutoPickNow {
        response: oneshot::Sender<DraftResult<PickOutcome>>,
    },

    GetSnapshot {
        response: oneshot::Sender<DraftSnapshot>,
    },

    Pause {
        response: oneshot::Sender<DraftResult<DraftState>>,
    },

    Resume {
        response: oneshot::Sender<DraftResult<DraftState>>,
    },

    /// The league breaker was reset by an operator
    BreakerReset,

    Close { response: oneshot::Sender<()> },

    /// Check the pick clock
    Tick,

    Subscribe {
        subscriber_id: Uuid,
        sender: mpsc::Sender<DraftEvent>,
    },

    Unsubscribe { subscriber_id: Uuid },
}

/// Events pushed to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    DraftStarted {
        league_id: LeagueId,
        order: Vec<TeamId>,
        total_picks: u32,
    },
    PickMade {
        league_id: LeagueId,
        pick: DraftPick,
    },
    OnTheClock {
        league_id: LeagueId,
        team_id: TeamId,
        pick_number: u32,
        round: u32,
        deadline: Option<DateTime<Utc>>,
    },
    AutoPickFailed {
        league_id: LeagueId,
        pick_number: u32,
        reason: String,
    },
    BreakerTripped {
        league_id: LeagueId,
        failures: u32,
    },
    BreakerReset {
        league_id: LeagueId,
    },
    DraftPaused {
        league_id: LeagueId,
    },
    DraftResumed {
        league_id: LeagueId,
        deadline: Option<DateTime<Utc>>,
    },
    DraftCompleted {
        league_id: LeagueId,
        total_picks: u32,
    },
}

impl DraftEvent {
    pub fn league_id(&self) -> LeagueId {
        match self {
            DraftEvent::DraftStarted { league_id, .. }
            | DraftEvent::PickMade { league_id, .. }
            | DraftEvent::OnTheClock { league_id, .. }
            | DraftEvent::AutoPickFailed { league_id, .. }
            | DraftEvent::BreakerTripped { league_id, .. }
            | DraftEvent::BreakerReset { league_id }
            | DraftEvent::DraftPaused { league_id }
            | DraftEvent::DraftResumed { league_id, .. }
            | DraftEvent::DraftCompleted { league_id, .. } => *league_id,
        }
    }

    /// `OnTheClock` for the state's current pick, `None` once complete
    pub fn on_the_clock(state: &DraftState) -> Option<Self> {
        state.team_on_clock().map(|team_id| DraftEvent::OnTheClock {
            league_id: state.league_id,
            team_id,
            pick_number: state.current_pick,
            round: state.current_round,
            deadline: state.pick_deadline,
        })
    }
}

/// Point-in-time view of a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub state: DraftState,
    pub on_the_clock: Option<TeamId>,
    pub seconds_remaining: Option<i64>,
    pub breaker: BreakerStatus,
}

impl DraftSnapshot {
    pub fn new(state: DraftState, breaker: BreakerStatus, now: DateTime<Utc>) -> Self {
        Self {
            on_the_clock: state.team_on_clock(),
            seconds_remaining: state.seconds_remaining(now),
            state,
            breaker,
        }
    }
}
