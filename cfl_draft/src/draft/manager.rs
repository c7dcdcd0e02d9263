//! Draft manager: starts drafts, spawns their actors and routes requests.

use super::{
    actor::{DraftActor, DraftHandle},
    autopick::{PickExecutor, PickOutcome},
    config::DraftConfig,
    errors::{DraftError, DraftResult},
    messages::{DraftEvent, DraftMessage, DraftSnapshot},
    models::{DraftPick, DraftStatus, LeagueId, PickSelection, TeamId},
    order::DraftOrderRandomizer,
    state::DraftState,
};
use crate::{
    db::DraftRepository,
    guard::{BreakerStatus, DraftGuard},
};
use chrono::Utc;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use uuid::Uuid;

/// Capacity of the manager-wide event stream
const EVENT_STREAM_CAPACITY: usize = 1024;

/// Manages all running drafts
pub struct DraftManager {
    repo: Arc<dyn DraftRepository>,

    guard: Arc<DraftGuard>,

    executor: Arc<PickExecutor>,

    config: DraftConfig,

    /// Running draft actors
    drafts: Arc<RwLock<HashMap<LeagueId, DraftHandle>>>,

    /// Every event from every draft
    events: broadcast::Sender<DraftEvent>,
}

impl DraftManager {
    pub fn new(repo: Arc<dyn DraftRepository>, config: DraftConfig) -> Self {
        let guard = Arc::new(DraftGuard::new(config.breaker_threshold));
        let executor = Arc::new(PickExecutor::new(
            repo.clone(),
            guard.clone(),
            config.autopick_max_attempts,
        ));
        let (events, _) = broadcast::channel(EVENT_STREAM_CAPACITY);

        Self {
            repo,
            guard,
            executor,
            config,
            drafts: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    /// Stream of events from all drafts (metrics, audit)
    pub fn events(&self) -> broadcast::Receiver<DraftEvent> {
        self.events.subscribe()
    }

    /// Spawn actors for drafts left in progress or paused
    pub async fn restore_active_drafts(&self) -> DraftResult<usize> {
        let leagues = self.repo.active_drafts().await?;
        let mut restored = 0;

        for league_id in leagues {
            if self.handle(league_id).await.is_some() {
                continue;
            }
            let state = self.repo.load_draft(league_id).await?;
            log::info!(
                "Restoring draft for league {} ({}, pick {}/{})",
                league_id,
                state.status,
                state.current_pick,
                state.total_picks
            );
            self.spawn_actor(state).await;
            restored += 1;
        }

        Ok(restored)
    }

    /// Create and start a league's draft.
    ///
    /// With no explicit order the league's teams are shuffled.
    pub async fn start_draft(
        &self,
        league_id: LeagueId,
        order: Option<Vec<TeamId>>,
    ) -> DraftResult<DraftState> {
        self.config.validate().map_err(DraftError::InvalidConfig)?;

        let teams = self.repo.league_teams(league_id).await?;
        if teams.is_empty() {
            return Err(DraftError::InvalidConfig(format!(
                "League {league_id} has no teams"
            )));
        }

        let order = match order {
            Some(order) => {
                validate_order(&order, &teams)?;
                order
            }
            None => DraftOrderRandomizer::new().shuffle(&teams),
        };

        let mut state = DraftState::new(league_id, order, self.config.roster_limits)?;
        state.start(Utc::now(), self.config.pick_timer())?;
        self.repo.create_draft(&state).await?;

        log::info!(
            "Draft for league {} started: {} teams, {} picks, {}s clock",
            league_id,
            state.order.len(),
            state.total_picks,
            state.pick_timer_secs
        );

        let _ = self.events.send(DraftEvent::DraftStarted {
            league_id,
            order: state.order.clone(),
            total_picks: state.total_picks,
        });
        if let Some(event) = DraftEvent::on_the_clock(&state) {
            let _ = self.events.send(event);
        }

        self.spawn_actor(state.clone()).await;
        Ok(state)
    }

    /// Make a manual pick for the team on the clock
    pub async fn make_pick(
        &self,
        league_id: LeagueId,
        selection: PickSelection,
    ) -> DraftResult<PickOutcome> {
        // reserve before taking the lock: the actor may be waiting on it
        let handle = self.handle(league_id).await;
        let permit = match &handle {
            Some(handle) => handle.reserve().await.ok(),
            None => None,
        };

        // the pick is committed either way; a stopped actor only misses the broadcast
        self.executor
            .make_pick_then(league_id, selection, move |outcome| {
                if let Some(permit) = permit {
                    permit.send(DraftMessage::PickRecorded {
                        outcome: Box::new(outcome.clone()),
                    });
                }
            })
            .await
    }

    /// Auto-pick for the team on the clock without waiting for the timer
    pub async fn auto_pick_now(&self, league_id: LeagueId) -> DraftResult<PickOutcome> {
        let handle = self.require_handle(league_id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(DraftMessage::AutoPickNow { response: tx })
            .await?;
        rx.await.map_err(|_| DraftError::ChannelClosed(league_id))?
    }

    /// Current state with clock and breaker details
    pub async fn draft_state(&self, league_id: LeagueId) -> DraftResult<DraftSnapshot> {
        if let Some(handle) = self.handle(league_id).await {
            let (tx, rx) = oneshot::channel();
            handle
                .send(DraftMessage::GetSnapshot { response: tx })
                .await?;
            if let Ok(snapshot) = rx.await {
                return Ok(snapshot);
            }
        }

        // finished or never started: read storage
        let state = self.repo.load_draft(league_id).await?;
        let breaker = self.guard.breaker_status(league_id).await;
        Ok(DraftSnapshot::new(state, breaker, Utc::now()))
    }

    pub async fn pause(&self, league_id: LeagueId) -> DraftResult<DraftState> {
        let handle = self.require_handle(league_id).await?;
        let (tx, rx) = oneshot::channel();
        handle.send(DraftMessage::Pause { response: tx }).await?;
        rx.await.map_err(|_| DraftError::ChannelClosed(league_id))?
    }

    pub async fn resume(&self, league_id: LeagueId) -> DraftResult<DraftState> {
        let handle = self.require_handle(league_id).await?;
        let (tx, rx) = oneshot::channel();
        handle.send(DraftMessage::Resume { response: tx }).await?;
        rx.await.map_err(|_| DraftError::ChannelClosed(league_id))?
    }

    /// Close the league's auto-pick breaker
    pub async fn reset_breaker(&self, league_id: LeagueId) -> DraftResult<BreakerStatus> {
        let status = self.guard.reset_breaker(league_id).await;
        if let Some(handle) = self.handle(league_id).await {
            handle.send(DraftMessage::BreakerReset).await?;
        }
        Ok(status)
    }

    pub async fn breaker_status(&self, league_id: LeagueId) -> BreakerStatus {
        self.guard.breaker_status(league_id).await
    }

    /// Receive a league's events on `sender`
    pub async fn subscribe(
        &self,
        league_id: LeagueId,
        subscriber_id: Uuid,
        sender: mpsc::Sender<DraftEvent>,
    ) -> DraftResult<()> {
        let handle = self.require_handle(league_id).await?;
        handle
            .send(DraftMessage::Subscribe {
                subscriber_id,
                sender,
            })
            .await
    }

    pub async fn unsubscribe(&self, league_id: LeagueId, subscriber_id: Uuid) {
        if let Some(handle) = self.handle(league_id).await {
            let _ = handle
                .send(DraftMessage::Unsubscribe { subscriber_id })
                .await;
        }
    }

    /// Picks made so far, in order
    pub async fn list_picks(&self, league_id: LeagueId) -> DraftResult<Vec<DraftPick>> {
        self.repo.list_picks(league_id).await
    }

    /// Stop a league's actor
    pub async fn close_draft(&self, league_id: LeagueId) -> DraftResult<()> {
        let handle = self.drafts.write().await.remove(&league_id);
        if let Some(handle) = handle {
            let (tx, rx) = oneshot::channel();
            if handle.send(DraftMessage::Close { response: tx }).await.is_ok() {
                let _ = rx.await;
            }
        }
        self.guard.forget(league_id).await;
        Ok(())
    }

    /// Number of running draft actors
    pub async fn active_draft_count(&self) -> usize {
        self.prune_finished().await;
        self.drafts.read().await.len()
    }

    /// Ask every actor to check its clock now
    pub async fn tick_all(&self) {
        let handles: Vec<DraftHandle> = self.drafts.read().await.values().cloned().collect();
        for handle in handles {
            let _ = handle.send(DraftMessage::Tick).await;
        }
    }

    async fn spawn_actor(&self, state: DraftState) {
        let league_id = state.league_id;
        let (actor, handle) = DraftActor::new(
            state,
            self.executor.clone(),
            self.repo.clone(),
            self.config.pick_timer(),
            self.events.clone(),
        );

        self.drafts.write().await.insert(league_id, handle);

        tokio::spawn(async move {
            actor.run().await;
        });
    }

    async fn handle(&self, league_id: LeagueId) -> Option<DraftHandle> {
        let handle = self.drafts.read().await.get(&league_id).cloned()?;
        if handle.is_closed() {
            self.drafts.write().await.remove(&league_id);
            self.guard.forget(league_id).await;
            return None;
        }
        Some(handle)
    }

    async fn require_handle(&self, league_id: LeagueId) -> DraftResult<DraftHandle> {
        if let Some(handle) = self.handle(league_id).await {
            return Ok(handle);
        }
        // explain why there is no running actor
        let state = self.repo.load_draft(league_id).await?;
        match state.status {
            DraftStatus::InProgress | DraftStatus::Paused => {
                Err(DraftError::ChannelClosed(league_id))
            }
            status => Err(DraftError::NotInProgress(status)),
        }
    }

    async fn prune_finished(&self) {
        let finished: Vec<LeagueId> = {
            let mut drafts = self.drafts.write().await;
            let finished = drafts
                .iter()
                .filter(|(_, handle)| handle.is_closed())
                .map(|(league_id, _)| *league_id)
                .collect::<Vec<_>>();
            for league_id in &finished {
                drafts.remove(league_id);
            }
            finished
        };

        for league_id in finished {
            self.guard.forget(league_id).await;
        }
    }
}

/// Explicit order must be a permutation of the league's teams
fn validate_order(order: &[TeamId], teams: &[TeamId]) -> DraftResult<()> {
    let league: HashSet<TeamId> = teams.iter().copied().collect();
    let given: HashSet<TeamId> = order.iter().copied().collect();

    if given.len() != order.len() {
        return Err(DraftError::InvalidConfig(
            "Draft order lists a team twice".to_string(),
        ));
    }
    if let Some(stranger) = order.iter().find(|team| !league.contains(team)) {
        return Err(DraftError::UnknownTeam(*stranger));
    }
    if given.len() != league.len() {
        return Err(DraftError::InvalidConfig(
            "Draft order must include every team in the league".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDraftRepository;
    use crate::draft::{AssetType, RosterLimits};
    use std::time::Duration;

    async fn two_pick_manager() -> DraftManager {
        let repo = Arc::new(InMemoryDraftRepository::new());
        repo.add_team(3, 1).await;
        repo.add_team(3, 2).await;
        repo.add_asset(31, AssetType::Brand, "Canopy", 30).await;
        repo.add_asset(32, AssetType::Brand, "Kush Co", 20).await;

        let config = DraftConfig {
            roster_limits: RosterLimits {
                manufacturer: 0,
                cannabis_strain: 0,
                product: 0,
                pharmacy: 0,
                brand: 1,
                flex: 0,
            },
            ..DraftConfig::default()
        };
        DraftManager::new(repo, config)
    }

    #[tokio::test]
    async fn test_finished_draft_releases_its_breaker() {
        let manager = two_pick_manager().await;
        manager.start_draft(3, Some(vec![1, 2])).await.unwrap();

        manager.guard.record_failure(3, "no assets").await;
        assert!(manager.guard.tracks_breaker(3).await);

        manager.auto_pick_now(3).await.unwrap();
        manager.auto_pick_now(3).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while manager.active_draft_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("actor should stop after the last pick");

        assert!(!manager.guard.tracks_breaker(3).await);
    }

    #[tokio::test]
    async fn test_close_draft_releases_its_breaker() {
        let manager = two_pick_manager().await;
        manager.start_draft(3, Some(vec![1, 2])).await.unwrap();
        manager.guard.record_failure(3, "no assets").await;

        manager.close_draft(3).await.unwrap();
        assert!(!manager.guard.tracks_breaker(3).await);
        assert_eq!(manager.active_draft_count().await, 0);
    }

    #[test]
    fn test_validate_order() {
        let teams = [1, 2, 3];
        assert!(validate_order(&[3, 1, 2], &teams).is_ok());
        assert!(validate_order(&[1, 1, 2], &teams).is_err());
        assert!(matches!(
            validate_order(&[1, 2, 9], &teams),
            Err(DraftError::UnknownTeam(9))
        ));
        assert!(validate_order(&[1, 2], &teams).is_err());
    }
}
