//! Draft actor: owns one league's pick clock and subscriber list.

use super::{
    autopick::{AutoPickTrigger, PickExecutor, PickOutcome},
    errors::{DraftError, DraftResult},
    messages::{DraftEvent, DraftMessage, DraftSnapshot},
    models::{DraftStatus, LeagueId},
    state::DraftState,
};
use crate::db::DraftRepository;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{broadcast, mpsc},
    time::{Duration, MissedTickBehavior, interval},
};
use uuid::Uuid;

/// Handle for sending messages to a draft actor
#[derive(Clone, Debug)]
pub struct DraftHandle {
    sender: mpsc::Sender<DraftMessage>,
    league_id: LeagueId,
}

impl DraftHandle {
    pub fn new(sender: mpsc::Sender<DraftMessage>, league_id: LeagueId) -> Self {
        Self { sender, league_id }
    }

    pub fn league_id(&self) -> LeagueId {
        self.league_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Reserve inbox capacity so a later send cannot wait
    pub async fn reserve(&self) -> DraftResult<mpsc::Permit<'_, DraftMessage>> {
        self.sender
            .reserve()
            .await
            .map_err(|_| DraftError::ChannelClosed(self.league_id))
    }

    pub async fn send(&self, message: DraftMessage) -> DraftResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| DraftError::ChannelClosed(self.league_id))
    }
}

/// Actor running a single league's draft
pub struct DraftActor {
    league_id: LeagueId,

    /// Latest known state
    state: DraftState,

    inbox: mpsc::Receiver<DraftMessage>,

    executor: Arc<PickExecutor>,

    repo: Arc<dyn DraftRepository>,

    pick_timer: Duration,

    /// Per-connection event channels
    subscribers: HashMap<Uuid, mpsc::Sender<DraftEvent>>,

    /// Manager-wide event stream
    events: broadcast::Sender<DraftEvent>,

    /// BreakerTripped already sent for the current open period
    breaker_announced: bool,

    is_closed: bool,
}

impl DraftActor {
    pub fn new(
        state: DraftState,
        executor: Arc<PickExecutor>,
        repo: Arc<dyn DraftRepository>,
        pick_timer: Duration,
        events: broadcast::Sender<DraftEvent>,
    ) -> (Self, DraftHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let league_id = state.league_id;

        let actor = Self {
            league_id,
            state,
            inbox,
            executor,
            repo,
            pick_timer,
            subscribers: HashMap::new(),
            events,
            breaker_announced: false,
            is_closed: false,
        };

        (actor, DraftHandle::new(sender, league_id))
    }

    /// Run the actor event loop until closed or the draft completes
    pub async fn run(mut self) {
        log::info!(
            "Draft actor for league {} starting at pick {}/{}",
            self.league_id,
            self.state.current_pick,
            self.state.total_picks
        );

        let mut tick_interval = interval(Duration::from_secs(1));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.is_closed {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => break,
                },

                _ = tick_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        log::info!("Draft actor for league {} stopped", self.league_id);
    }

    async fn handle_message(&mut self, message: DraftMessage) {
        match message {
            DraftMessage::PickRecorded { outcome } => {
                self.on_pick(*outcome);
            }

            DraftMessage::AutoPickNow { response } => {
                let result = self.auto_pick(AutoPickTrigger::Requested).await;
                let _ = response.send(result);
            }

            DraftMessage::GetSnapshot { response } => {
                let breaker = self.executor.guard().breaker_status(self.league_id).await;
                let _ = response.send(DraftSnapshot::new(self.state.clone(), breaker, Utc::now()));
            }

            DraftMessage::Pause { response } => {
                let result = self.pause().await;
                let _ = response.send(result);
            }

            DraftMessage::Resume { response } => {
                let result = self.resume().await;
                let _ = response.send(result);
            }

            DraftMessage::BreakerReset => {
                self.breaker_announced = false;
                self.broadcast(DraftEvent::BreakerReset {
                    league_id: self.league_id,
                });
            }

            DraftMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }

            DraftMessage::Tick => {
                self.tick().await;
            }

            DraftMessage::Subscribe {
                subscriber_id,
                sender,
            } => {
                // new subscribers learn who is up
                if let Some(event) = DraftEvent::on_the_clock(&self.state) {
                    let _ = sender.try_send(event);
                }
                self.subscribers.insert(subscriber_id, sender);
                log::debug!(
                    "Subscriber {} joined draft for league {}",
                    subscriber_id,
                    self.league_id
                );
            }

            DraftMessage::Unsubscribe { subscriber_id } => {
                self.subscribers.remove(&subscriber_id);
                log::debug!(
                    "Subscriber {} left draft for league {}",
                    subscriber_id,
                    self.league_id
                );
            }
        }
    }

    /// Auto-pick when the clock has run out
    async fn tick(&mut self) {
        if !self.state.is_expired(Utc::now()) {
            return;
        }

        // PickInProgress means a manual pick holds the lock; the next tick retries
        let pick_number = self.state.current_pick;
        if let Err(DraftError::PickSuperseded(_)) = self
            .auto_pick(AutoPickTrigger::TimerExpired { pick_number })
            .await
        {
            self.refresh().await;
        }
    }

    async fn auto_pick(&mut self, trigger: AutoPickTrigger) -> DraftResult<PickOutcome> {
        let result = self.executor.auto_pick(self.league_id, trigger).await;

        match &result {
            Ok(outcome) => self.on_pick(outcome.clone()),
            Err(DraftError::BreakerOpen { failures, .. }) => {
                let failures = *failures;
                self.announce_breaker(failures);
            }
            Err(e) if e.counts_as_autopick_failure() => {
                self.broadcast(DraftEvent::AutoPickFailed {
                    league_id: self.league_id,
                    pick_number: self.state.current_pick,
                    reason: e.client_message(),
                });
                let status = self.executor.guard().breaker_status(self.league_id).await;
                if status.is_open() {
                    self.announce_breaker(status.consecutive_failures);
                }
            }
            Err(_) => {}
        }

        result
    }

    fn announce_breaker(&mut self, failures: u32) {
        if self.breaker_announced {
            return;
        }
        self.breaker_announced = true;
        self.broadcast(DraftEvent::BreakerTripped {
            league_id: self.league_id,
            failures,
        });
    }

    fn on_pick(&mut self, outcome: PickOutcome) {
        self.broadcast(DraftEvent::PickMade {
            league_id: self.league_id,
            pick: outcome.pick,
        });

        if outcome.state.picks_made >= self.state.picks_made {
            self.state = outcome.state;
        }

        if self.state.status == DraftStatus::Completed {
            log::info!(
                "Draft for league {} completed after {} picks",
                self.league_id,
                self.state.picks_made
            );
            self.broadcast(DraftEvent::DraftCompleted {
                league_id: self.league_id,
                total_picks: self.state.total_picks,
            });
            self.is_closed = true;
        } else if let Some(event) = DraftEvent::on_the_clock(&self.state) {
            self.broadcast(event);
        }
    }

    /// Reload state after another writer moved the draft
    async fn refresh(&mut self) {
        match self.repo.load_draft(self.league_id).await {
            Ok(state) => {
                if state.picks_made >= self.state.picks_made {
                    self.state = state;
                }
            }
            Err(e) => log::error!(
                "Draft actor for league {}: failed to reload state: {}",
                self.league_id,
                e
            ),
        }
    }

    async fn pause(&mut self) -> DraftResult<DraftState> {
        let _lock = self.executor.guard().locks().acquire(self.league_id).await;
        let mut state = self.repo.load_draft(self.league_id).await?;
        state.pause()?;
        self.repo.update_draft_status(&state).await?;

        self.state = state.clone();
        self.broadcast(DraftEvent::DraftPaused {
            league_id: self.league_id,
        });
        log::info!("Draft for league {} paused", self.league_id);
        Ok(state)
    }

    async fn resume(&mut self) -> DraftResult<DraftState> {
        let _lock = self.executor.guard().locks().acquire(self.league_id).await;
        let mut state = self.repo.load_draft(self.league_id).await?;
        state.resume(Utc::now(), self.pick_timer)?;
        self.repo.update_draft_status(&state).await?;

        self.state = state.clone();
        self.broadcast(DraftEvent::DraftResumed {
            league_id: self.league_id,
            deadline: state.pick_deadline,
        });
        log::info!("Draft for league {} resumed", self.league_id);
        Ok(state)
    }

    /// Send to every subscriber, dropping closed channels
    fn broadcast(&mut self, event: DraftEvent) {
        // no receivers is fine
        let _ = self.events.send(event.clone());

        self.subscribers.retain(|subscriber_id, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Subscriber {} channel full, dropping draft event",
                        subscriber_id
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}
