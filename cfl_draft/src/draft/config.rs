//! Draft configuration models.

use super::models::RosterLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pick clock presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftSpeed {
    Slow,
    Normal,
    Fast,
}

impl std::fmt::Display for DraftSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftSpeed::Slow => write!(f, "slow"),
            DraftSpeed::Normal => write!(f, "normal"),
            DraftSpeed::Fast => write!(f, "fast"),
        }
    }
}

impl std::str::FromStr for DraftSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slow" => Ok(DraftSpeed::Slow),
            "normal" => Ok(DraftSpeed::Normal),
            "fast" => Ok(DraftSpeed::Fast),
            other => Err(format!("unknown draft speed '{other}'")),
        }
    }
}

impl DraftSpeed {
    /// Default seconds on the clock per pick
    pub fn pick_timer_secs(&self) -> u64 {
        match self {
            DraftSpeed::Slow => 180,
            DraftSpeed::Normal => 90,
            DraftSpeed::Fast => 30,
        }
    }
}

/// Draft configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Slots per position
    pub roster_limits: RosterLimits,

    /// Pick clock preset
    pub speed: DraftSpeed,

    /// Explicit pick clock, overrides `speed` when set
    pub pick_timer_secs: Option<u64>,

    /// Auto-pick attempts before giving up on conflicts (default: 3)
    pub autopick_max_attempts: u32,

    /// Consecutive auto-pick failures before the breaker opens (default: 3)
    pub breaker_threshold: u32,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            roster_limits: RosterLimits::default(),
            speed: DraftSpeed::Normal,
            pick_timer_secs: None,
            autopick_max_attempts: 3,
            breaker_threshold: 3,
        }
    }
}

impl DraftConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.roster_limits.validate()?;

        if self.pick_timer_secs == Some(0) {
            return Err("Pick timer must be at least 1 second".to_string());
        }

        if self.autopick_max_attempts == 0 || self.autopick_max_attempts > 10 {
            return Err("Auto-pick attempts must be between 1 and 10".to_string());
        }

        if self.breaker_threshold == 0 {
            return Err("Breaker threshold must be at least 1".to_string());
        }

        Ok(())
    }

    /// Seconds on the clock per pick
    pub fn pick_timer_secs(&self) -> u64 {
        self.pick_timer_secs
            .unwrap_or_else(|| self.speed.pick_timer_secs())
    }

    /// Pick clock as a duration
    pub fn pick_timer(&self) -> Duration {
        Duration::from_secs(self.pick_timer_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DraftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pick_timer_secs(), 90);
    }

    #[test]
    fn test_explicit_timer_overrides_speed() {
        let config = DraftConfig {
            speed: DraftSpeed::Slow,
            pick_timer_secs: Some(5),
            ..DraftConfig::default()
        };
        assert_eq!(config.pick_timer(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_attempts() {
        let config = DraftConfig {
            autopick_max_attempts: 0,
            ..DraftConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = DraftConfig {
            breaker_threshold: 0,
            ..DraftConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speed_parsing() {
        assert_eq!("FAST".parse::<DraftSpeed>().unwrap(), DraftSpeed::Fast);
        assert!("blitz".parse::<DraftSpeed>().is_err());
    }
}
