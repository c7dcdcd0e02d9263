//! Concurrency guard for picks.
//!
//! - **League locks**: one pick at a time per league, manual or automatic.
//! - **Circuit breakers**: one per league, opened after consecutive auto-pick
//!   failures and closed only by [`DraftGuard::reset_breaker`].

pub mod circuit_breaker;
pub mod locks;

pub use circuit_breaker::{BreakerState, BreakerStatus, CircuitBreaker};
pub use locks::{LeagueLockGuard, LeagueLocks};

use crate::draft::{DraftError, DraftResult, LeagueId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// League locks plus per-league breakers
#[derive(Debug)]
pub struct DraftGuard {
    locks: LeagueLocks,
    breakers: RwLock<HashMap<LeagueId, CircuitBreaker>>,
    threshold: u32,
}

impl DraftGuard {
    pub fn new(breaker_threshold: u32) -> Self {
        Self {
            locks: LeagueLocks::new(),
            breakers: RwLock::new(HashMap::new()),
            threshold: breaker_threshold,
        }
    }

    pub fn locks(&self) -> &LeagueLocks {
        &self.locks
    }

    /// Refuse automatic work if the league breaker is open
    pub async fn check_breaker(&self, league_id: LeagueId) -> DraftResult<()> {
        match self.breakers.read().await.get(&league_id) {
            Some(breaker) if !breaker.can_execute() => Err(DraftError::BreakerOpen {
                league_id,
                failures: breaker.consecutive_failures(),
            }),
            _ => Ok(()),
        }
    }

    pub async fn record_success(&self, league_id: LeagueId) {
        if let Some(breaker) = self.breakers.write().await.get_mut(&league_id) {
            breaker.record_success();
        }
    }

    /// Count an auto-pick failure. Returns true when the breaker just opened.
    pub async fn record_failure(&self, league_id: LeagueId, reason: &str) -> bool {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers
            .entry(league_id)
            .or_insert_with(|| CircuitBreaker::new(self.threshold));
        let tripped = breaker.record_failure(reason);
        if tripped {
            log::warn!(
                "Auto-pick breaker opened for league {} after {} consecutive failures: {}",
                league_id,
                breaker.consecutive_failures(),
                reason
            );
        }
        tripped
    }

    pub async fn breaker_status(&self, league_id: LeagueId) -> BreakerStatus {
        self.breakers
            .read()
            .await
            .get(&league_id)
            .map(CircuitBreaker::status)
            .unwrap_or_else(|| CircuitBreaker::new(self.threshold).status())
    }

    /// Close the league breaker
    pub async fn reset_breaker(&self, league_id: LeagueId) -> BreakerStatus {
        let mut breakers = self.breakers.write().await;
        match breakers.get_mut(&league_id) {
            Some(breaker) => {
                breaker.reset();
                log::info!("Auto-pick breaker reset for league {}", league_id);
                breaker.status()
            }
            // never failed, or forgotten with its draft
            None => CircuitBreaker::new(self.threshold).status(),
        }
    }

    /// Drop lock and breaker for a finished draft
    pub async fn forget(&self, league_id: LeagueId) {
        self.locks.remove(league_id).await;
        self.breakers.write().await.remove(&league_id);
    }

    /// Whether a breaker entry exists for the league
    #[cfg(test)]
    pub(crate) async fn tracks_breaker(&self, league_id: LeagueId) -> bool {
        self.breakers.read().await.contains_key(&league_id)
    }
}
