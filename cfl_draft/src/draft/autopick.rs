//! Pick execution under the league lock, with conflict retry for auto-picks.

use super::{
    errors::{DraftError, DraftResult},
    models::{
        AssetId, AssetType, Candidate, DraftPick, DraftStatus, LeagueId, PickSelection, Position,
        TeamId,
    },
    policy::PickPolicy,
    state::DraftState,
};
use crate::{db::DraftRepository, guard::DraftGuard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

/// What started an auto-pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPickTrigger {
    /// The clock ran out on this pick. Skipped if the lock is busy or the
    /// draft has already moved on.
    TimerExpired { pick_number: u32 },
    /// A client asked for the pick to be made now. Waits for the lock.
    Requested,
}

/// Result of a successful pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickOutcome {
    pub pick: DraftPick,
    /// Draft state after the pick
    pub state: DraftState,
    /// Attempts used (always 1 for manual picks)
    pub attempts: u32,
    /// Ranking details for auto-picks
    pub candidate: Option<Candidate>,
}

/// Makes picks one at a time per league
pub struct PickExecutor {
    repo: Arc<dyn DraftRepository>,
    guard: Arc<DraftGuard>,
    policy: PickPolicy,
    max_attempts: u32,
}

impl PickExecutor {
    pub fn new(repo: Arc<dyn DraftRepository>, guard: Arc<DraftGuard>, max_attempts: u32) -> Self {
        Self {
            repo,
            guard,
            policy: PickPolicy,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn guard(&self) -> &Arc<DraftGuard> {
        &self.guard
    }

    /// Make a manual pick for the team on the clock.
    ///
    /// Allowed while the breaker is open. A conflict is returned to the caller
    /// rather than retried.
    pub async fn make_pick(
        &self,
        league_id: LeagueId,
        selection: PickSelection,
    ) -> DraftResult<PickOutcome> {
        self.make_pick_then(league_id, selection, |_| {}).await
    }

    /// Make a manual pick and run `on_commit` before the league lock is released.
    ///
    /// Notifications sent from `on_commit` are ordered the same as the picks.
    pub async fn make_pick_then<F>(
        &self,
        league_id: LeagueId,
        selection: PickSelection,
        on_commit: F,
    ) -> DraftResult<PickOutcome>
    where
        F: FnOnce(&PickOutcome) + Send,
    {
        let _lock = self.guard.locks().acquire(league_id).await;
        let outcome = self.make_pick_locked(league_id, selection).await?;
        on_commit(&outcome);
        Ok(outcome)
    }

    async fn make_pick_locked(
        &self,
        league_id: LeagueId,
        selection: PickSelection,
    ) -> DraftResult<PickOutcome> {
        let state = self.repo.load_draft(league_id).await?;
        let team_id = ensure_on_clock(&state)?;
        if selection.team_id != team_id {
            return Err(DraftError::NotYourTurn {
                team_id: selection.team_id,
                on_clock: team_id,
            });
        }

        let asset = self
            .repo
            .find_asset(selection.asset_id)
            .await?
            .ok_or(DraftError::AssetNotFound(selection.asset_id))?;
        let position = state
            .roster(team_id)?
            .slot_for(asset.asset_type, &state.limits)
            .ok_or(DraftError::NoSlotForAsset {
                team_id,
                asset_type: asset.asset_type,
            })?;

        let pick = build_pick(
            &state,
            team_id,
            asset.id,
            asset.asset_type,
            position,
            false,
            Utc::now(),
        );
        let next = self.commit(&state, &pick).await?;

        log::info!(
            "League {}: pick {} (round {}) team {} took {} '{}'",
            league_id,
            pick.pick_number,
            pick.round,
            team_id,
            asset.asset_type,
            asset.name
        );

        Ok(PickOutcome {
            pick,
            state: next,
            attempts: 1,
            candidate: None,
        })
    }

    /// Pick the best available asset for the team on the clock.
    ///
    /// Refused while the league breaker is open. Failures that count against
    /// the breaker are recorded, and a success clears the failure run.
    pub async fn auto_pick(
        &self,
        league_id: LeagueId,
        trigger: AutoPickTrigger,
    ) -> DraftResult<PickOutcome> {
        self.guard.check_breaker(league_id).await?;

        let _lock = match trigger {
            AutoPickTrigger::TimerExpired { .. } => self
                .guard
                .locks()
                .try_acquire(league_id)
                .await
                .ok_or(DraftError::PickInProgress(league_id))?,
            AutoPickTrigger::Requested => self.guard.locks().acquire(league_id).await,
        };

        let result = self.auto_pick_locked(league_id, trigger).await;

        match &result {
            Ok(outcome) => {
                self.guard.record_success(league_id).await;
                log::info!(
                    "League {}: auto-pick {} team {} took asset {} ({} tier, {} attempt(s))",
                    league_id,
                    outcome.pick.pick_number,
                    outcome.pick.team_id,
                    outcome.pick.asset_id,
                    outcome
                        .candidate
                        .as_ref()
                        .map(|c| c.tier.to_string())
                        .unwrap_or_default(),
                    outcome.attempts
                );
            }
            Err(e) if e.counts_as_autopick_failure() => {
                log::warn!("League {}: auto-pick failed: {}", league_id, e);
                self.guard.record_failure(league_id, &e.to_string()).await;
            }
            Err(e) => {
                log::debug!("League {}: auto-pick skipped: {}", league_id, e);
            }
        }

        result
    }

    async fn auto_pick_locked(
        &self,
        league_id: LeagueId,
        trigger: AutoPickTrigger,
    ) -> DraftResult<PickOutcome> {
        let mut excluded: HashSet<AssetId> = HashSet::new();

        for attempt in 1..=self.max_attempts {
            let state = self.repo.load_draft(league_id).await?;
            if let AutoPickTrigger::TimerExpired { pick_number } = trigger {
                if state.current_pick != pick_number {
                    return Err(DraftError::PickSuperseded(pick_number));
                }
            }
            let team_id = ensure_on_clock(&state)?;
            let counts = state.roster(team_id)?;

            let now = Utc::now();
            let selection = self
                .policy
                .select(
                    self.repo.as_ref(),
                    league_id,
                    team_id,
                    &counts,
                    &state.limits,
                    now.date_naive(),
                    &excluded,
                )
                .await?;

            let candidate = selection.candidate;
            let pick = build_pick(
                &state,
                team_id,
                candidate.asset_id,
                candidate.asset_type,
                selection.position,
                true,
                now,
            );

            match self.commit(&state, &pick).await {
                Ok(next) => {
                    return Ok(PickOutcome {
                        pick,
                        state: next,
                        attempts: attempt,
                        candidate: Some(candidate),
                    });
                }
                Err(DraftError::AlreadyDrafted { asset_id }) => {
                    log::warn!(
                        "League {}: asset {} was taken concurrently, retrying ({}/{})",
                        league_id,
                        asset_id,
                        attempt,
                        self.max_attempts
                    );
                    excluded.insert(asset_id);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DraftError::RetriesExhausted(self.max_attempts))
    }

    /// Apply the pick to a copy of the state and persist both atomically
    async fn commit(&self, state: &DraftState, pick: &DraftPick) -> DraftResult<DraftState> {
        let mut next = state.clone();
        next.apply_pick(pick)?;
        self.repo.record_pick(pick, &next).await?;
        Ok(next)
    }
}

fn ensure_on_clock(state: &DraftState) -> DraftResult<TeamId> {
    if state.status != DraftStatus::InProgress {
        return Err(DraftError::NotInProgress(state.status));
    }
    state
        .team_on_clock()
        .ok_or(DraftError::NotInProgress(state.status))
}

fn build_pick(
    state: &DraftState,
    team_id: TeamId,
    asset_id: AssetId,
    asset_type: AssetType,
    position: Position,
    auto_pick: bool,
    picked_at: DateTime<Utc>,
) -> DraftPick {
    DraftPick {
        league_id: state.league_id,
        pick_number: state.current_pick,
        round: state.current_round,
        team_id,
        asset_type,
        asset_id,
        position,
        auto_pick,
        picked_at,
    }
}
