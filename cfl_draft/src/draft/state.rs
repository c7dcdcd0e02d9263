//! Draft progress state.

use super::{
    errors::{DraftError, DraftResult},
    models::{DraftPick, DraftStatus, LeagueId, RosterCounts, RosterLimits, TeamId},
    order,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Progress of one league's draft.
///
/// [`DraftState::apply_pick`] is the only way picks advance the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub league_id: LeagueId,
    pub status: DraftStatus,
    /// Next pick to be made, 1-based
    pub current_pick: u32,
    /// Round of `current_pick`, 1-based
    pub current_round: u32,
    pub total_picks: u32,
    /// Team order for odd rounds
    pub order: Vec<TeamId>,
    pub rosters: BTreeMap<TeamId, RosterCounts>,
    pub limits: RosterLimits,
    pub pick_timer_secs: u64,
    pub pick_deadline: Option<DateTime<Utc>>,
    pub picks_made: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DraftState {
    /// Create a pending draft
    pub fn new(league_id: LeagueId, order: Vec<TeamId>, limits: RosterLimits) -> DraftResult<Self> {
        if order.is_empty() {
            return Err(DraftError::InvalidConfig(
                "Draft needs at least one team".to_string(),
            ));
        }
        limits.validate().map_err(DraftError::InvalidConfig)?;

        let mut rosters = BTreeMap::new();
        for team_id in &order {
            if rosters.insert(*team_id, RosterCounts::default()).is_some() {
                return Err(DraftError::InvalidConfig(format!(
                    "Team {team_id} appears twice in draft order"
                )));
            }
        }

        Ok(Self {
            league_id,
            status: DraftStatus::Pending,
            current_pick: 1,
            current_round: 1,
            total_picks: order::total_picks(order.len(), &limits),
            order,
            rosters,
            limits,
            pick_timer_secs: 0,
            pick_deadline: None,
            picks_made: 0,
            started_at: None,
            completed_at: None,
        })
    }

    /// Start the draft and put the first team on the clock
    pub fn start(&mut self, now: DateTime<Utc>, pick_timer: Duration) -> DraftResult<()> {
        if self.status != DraftStatus::Pending {
            return Err(DraftError::InvalidTransition {
                from: self.status,
                to: DraftStatus::InProgress,
            });
        }

        self.status = DraftStatus::InProgress;
        self.pick_timer_secs = pick_timer.as_secs();
        self.started_at = Some(now);
        self.pick_deadline = self.deadline_from(now);
        Ok(())
    }

    /// Team owning the current pick, `None` once the draft is complete
    pub fn team_on_clock(&self) -> Option<TeamId> {
        if self.status == DraftStatus::Completed {
            return None;
        }
        order::team_for_pick(&self.order, self.current_pick)
    }

    /// Roster counts for a team
    pub fn roster(&self, team_id: TeamId) -> DraftResult<RosterCounts> {
        self.rosters
            .get(&team_id)
            .copied()
            .ok_or(DraftError::UnknownTeam(team_id))
    }

    /// Apply a pick, advancing to the next one.
    ///
    /// The pick must be for the current pick number, by the team on the clock,
    /// into a slot with room. On the last pick the draft completes.
    pub fn apply_pick(&mut self, pick: &DraftPick) -> DraftResult<()> {
        if self.status != DraftStatus::InProgress {
            return Err(DraftError::NotInProgress(self.status));
        }

        if pick.pick_number != self.current_pick {
            return Err(DraftError::StalePick {
                current: self.current_pick,
                got: pick.pick_number,
            });
        }

        let on_clock = self
            .team_on_clock()
            .ok_or(DraftError::NotInProgress(self.status))?;
        if pick.team_id != on_clock {
            return Err(DraftError::NotYourTurn {
                team_id: pick.team_id,
                on_clock,
            });
        }

        if !pick.position.accepts(pick.asset_type) {
            return Err(DraftError::NoSlotForAsset {
                team_id: pick.team_id,
                asset_type: pick.asset_type,
            });
        }

        let limits = self.limits;
        let counts = self
            .rosters
            .get_mut(&pick.team_id)
            .ok_or(DraftError::UnknownTeam(pick.team_id))?;
        if counts.remaining_need(pick.position, &limits) == 0 {
            return Err(DraftError::SlotFull {
                team_id: pick.team_id,
                position: pick.position,
            });
        }
        counts.increment(pick.position);

        self.picks_made += 1;
        self.current_pick += 1;

        if self.current_pick > self.total_picks {
            self.status = DraftStatus::Completed;
            self.pick_deadline = None;
            self.completed_at = Some(pick.picked_at);
        } else {
            self.current_round =
                order::round_for_pick(self.current_pick, self.order.len()).unwrap_or(1);
            self.pick_deadline = self.deadline_from(pick.picked_at);
        }

        Ok(())
    }

    /// Stop the clock
    pub fn pause(&mut self) -> DraftResult<()> {
        if self.status != DraftStatus::InProgress {
            return Err(DraftError::InvalidTransition {
                from: self.status,
                to: DraftStatus::Paused,
            });
        }
        self.status = DraftStatus::Paused;
        self.pick_deadline = None;
        Ok(())
    }

    /// Restart the clock with a full pick timer
    pub fn resume(&mut self, now: DateTime<Utc>, pick_timer: Duration) -> DraftResult<()> {
        if self.status != DraftStatus::Paused {
            return Err(DraftError::InvalidTransition {
                from: self.status,
                to: DraftStatus::InProgress,
            });
        }
        self.status = DraftStatus::InProgress;
        self.pick_timer_secs = pick_timer.as_secs();
        self.pick_deadline = self.deadline_from(now);
        Ok(())
    }

    /// Whether the pick clock has run out
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == DraftStatus::InProgress
            && self.pick_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Seconds left on the clock
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.pick_deadline
            .map(|deadline| (deadline - now).num_seconds().max(0))
    }

    fn deadline_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.pick_timer_secs as i64)
            .and_then(|timer| now.checked_add_signed(timer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::models::{AssetType, Position};

    fn limits(per_team: u8) -> RosterLimits {
        RosterLimits {
            manufacturer: per_team,
            cannabis_strain: 0,
            product: 0,
            pharmacy: 0,
            brand: 0,
            flex: 0,
        }
    }

    fn pick(state: &DraftState, asset_id: i64) -> DraftPick {
        DraftPick {
            league_id: state.league_id,
            pick_number: state.current_pick,
            round: state.current_round,
            team_id: state.team_on_clock().unwrap(),
            asset_type: AssetType::Manufacturer,
            asset_id,
            position: Position::Manufacturer,
            auto_pick: false,
            picked_at: Utc::now(),
        }
    }

    fn started(order: Vec<TeamId>, per_team: u8) -> DraftState {
        let mut state = DraftState::new(1, order, limits(per_team)).unwrap();
        state.start(Utc::now(), Duration::from_secs(60)).unwrap();
        state
    }

    #[test]
    fn test_new_draft_is_pending() {
        let state = DraftState::new(1, vec![1, 2], RosterLimits::default()).unwrap();
        assert_eq!(state.status, DraftStatus::Pending);
        assert_eq!(state.current_pick, 1);
        assert_eq!(state.total_picks, 20);
        assert!(state.pick_deadline.is_none());
    }

    #[test]
    fn test_new_rejects_duplicate_and_empty_order() {
        assert!(DraftState::new(1, vec![], RosterLimits::default()).is_err());
        assert!(DraftState::new(1, vec![3, 3], RosterLimits::default()).is_err());
    }

    #[test]
    fn test_start_sets_deadline() {
        let now = Utc::now();
        let mut state = DraftState::new(1, vec![1, 2], RosterLimits::default()).unwrap();
        state.start(now, Duration::from_secs(30)).unwrap();
        assert_eq!(state.status, DraftStatus::InProgress);
        assert_eq!(state.pick_deadline, Some(now + TimeDelta::seconds(30)));
        assert!(state.start(now, Duration::from_secs(30)).is_err());
    }

    #[test]
    fn test_apply_pick_advances_snake() {
        let mut state = started(vec![7, 8], 2);
        assert_eq!(state.team_on_clock(), Some(7));

        let first = pick(&state, 100);
        state.apply_pick(&first).unwrap();
        assert_eq!(state.current_pick, 2);
        assert_eq!(state.team_on_clock(), Some(8));

        state.apply_pick(&pick(&state, 101)).unwrap();
        assert_eq!(state.current_round, 2);
        assert_eq!(state.team_on_clock(), Some(8));
        assert_eq!(state.roster(7).unwrap().manufacturer, 1);
    }

    #[test]
    fn test_same_pick_applied_twice_is_stale() {
        let mut state = started(vec![7, 8], 2);
        let first = pick(&state, 100);
        state.apply_pick(&first).unwrap();

        let err = state.apply_pick(&first).unwrap_err();
        assert!(matches!(err, DraftError::StalePick { current: 2, got: 1 }));
        assert_eq!(state.picks_made, 1);
    }

    #[test]
    fn test_wrong_team_rejected() {
        let mut state = started(vec![7, 8], 2);
        let mut bad = pick(&state, 100);
        bad.team_id = 8;
        assert!(matches!(
            state.apply_pick(&bad),
            Err(DraftError::NotYourTurn { team_id: 8, on_clock: 7 })
        ));
    }

    #[test]
    fn test_full_slot_rejected() {
        let mut state = started(vec![7], 1);
        let mut bad = pick(&state, 100);
        bad.asset_type = AssetType::Brand;
        bad.position = Position::Brand;
        assert!(matches!(
            state.apply_pick(&bad),
            Err(DraftError::SlotFull { .. })
        ));
    }

    #[test]
    fn test_mismatched_slot_rejected() {
        let mut state = started(vec![7], 1);
        let mut bad = pick(&state, 100);
        bad.asset_type = AssetType::Brand;
        assert!(matches!(
            state.apply_pick(&bad),
            Err(DraftError::NoSlotForAsset { .. })
        ));
    }

    #[test]
    fn test_last_pick_completes_draft() {
        let mut state = started(vec![1, 2], 1);
        state.apply_pick(&pick(&state, 1)).unwrap();
        state.apply_pick(&pick(&state, 2)).unwrap();

        assert_eq!(state.status, DraftStatus::Completed);
        assert_eq!(state.team_on_clock(), None);
        assert!(state.pick_deadline.is_none());
        assert!(state.completed_at.is_some());
        assert_eq!(state.picks_made, state.total_picks);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut state = started(vec![1, 2], 1);
        let pending = pick(&state, 5);
        state.pause().unwrap();
        assert!(!state.is_expired(Utc::now() + TimeDelta::hours(1)));
        assert!(matches!(
            state.apply_pick(&pending),
            Err(DraftError::NotInProgress(DraftStatus::Paused))
        ));

        let now = Utc::now();
        state.resume(now, Duration::from_secs(10)).unwrap();
        assert_eq!(state.seconds_remaining(now), Some(10));
        assert!(state.resume(now, Duration::from_secs(10)).is_err());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut state = DraftState::new(1, vec![1], limits(1)).unwrap();
        state.start(now, Duration::from_secs(5)).unwrap();
        assert!(!state.is_expired(now));
        assert!(state.is_expired(now + TimeDelta::seconds(5)));
        assert_eq!(state.seconds_remaining(now + TimeDelta::seconds(9)), Some(0));
    }
}
