//! Auto-pick circuit breaker.
//!
//! Opens after a run of consecutive failures and stays open until an operator
//! resets it. There is no time-based recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
}

/// Snapshot of a breaker for clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl BreakerStatus {
    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }
}

/// Consecutive-failure breaker
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    threshold: u32,
    opened_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            threshold: threshold.max(1),
            opened_at: None,
            last_error: None,
        }
    }

    /// Whether automatic work may run
    pub fn can_execute(&self) -> bool {
        self.state == BreakerState::Closed
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Clear the failure run
    pub fn record_success(&mut self) {
        if self.state == BreakerState::Closed && self.consecutive_failures > 0 {
            log::debug!(
                "Circuit breaker: resetting failure count from {}",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
            self.last_error = None;
        }
    }

    /// Count a failure. Returns true when this failure opened the breaker.
    pub fn record_failure(&mut self, reason: impl Into<String>) -> bool {
        self.consecutive_failures += 1;
        self.last_error = Some(reason.into());

        if self.state == BreakerState::Closed && self.consecutive_failures >= self.threshold {
            self.state = BreakerState::Open;
            self.opened_at = Some(Utc::now());
            return true;
        }
        false
    }

    /// Manual reset back to closed
    pub fn reset(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.last_error = None;
    }

    pub fn status(&self) -> BreakerStatus {
        BreakerStatus {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            threshold: self.threshold,
            opened_at: self.opened_at,
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3)
    }
}
