//! Per-league pick locks.

use crate::draft::LeagueId;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Held while a pick for a league is being made. Releases on drop.
#[derive(Debug)]
pub struct LeagueLockGuard {
    league_id: LeagueId,
    _guard: OwnedMutexGuard<()>,
}

impl LeagueLockGuard {
    pub fn league_id(&self) -> LeagueId {
        self.league_id
    }
}

/// Mutual exclusion keyed by league
#[derive(Debug, Default)]
pub struct LeagueLocks {
    locks: RwLock<HashMap<LeagueId, Arc<Mutex<()>>>>,
}

impl LeagueLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, league_id: LeagueId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&league_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(league_id)
            .or_default()
            .clone()
    }

    /// Wait for the league lock
    pub async fn acquire(&self, league_id: LeagueId) -> LeagueLockGuard {
        let guard = self.lock_for(league_id).await.lock_owned().await;
        LeagueLockGuard {
            league_id,
            _guard: guard,
        }
    }

    /// Take the league lock if free
    pub async fn try_acquire(&self, league_id: LeagueId) -> Option<LeagueLockGuard> {
        let guard = self.lock_for(league_id).await.try_lock_owned().ok()?;
        Some(LeagueLockGuard {
            league_id,
            _guard: guard,
        })
    }

    /// Whether a pick is currently in progress for a league
    pub async fn is_locked(&self, league_id: LeagueId) -> bool {
        match self.locks.read().await.get(&league_id) {
            Some(lock) => lock.try_lock().is_err(),
            None => false,
        }
    }

    /// Forget a league's lock (draft finished)
    pub async fn remove(&self, league_id: LeagueId) {
        self.locks.write().await.remove(&league_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_try_acquire_fails_while_held() {
        let locks = LeagueLocks::new();
        let guard = locks.acquire(1).await;
        assert_eq!(guard.league_id(), 1);
        assert!(locks.is_locked(1).await);
        assert!(locks.try_acquire(1).await.is_none());

        drop(guard);
        assert!(!locks.is_locked(1).await);
        assert!(locks.try_acquire(1).await.is_some());
    }

    #[tokio::test]
    async fn test_leagues_are_independent() {
        let locks = LeagueLocks::new();
        let _one = locks.acquire(1).await;
        assert!(locks.try_acquire(2).await.is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let locks = Arc::new(LeagueLocks::new());
        let guard = locks.acquire(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(7).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should get the lock")
            .unwrap();
    }
}
