//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use cfl_draft::db::DatabaseConfig;
use cfl_draft::draft::{DraftConfig, DraftSpeed, RosterLimits};
use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape endpoint, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Defaults applied to every draft started by this server
    pub draft_defaults: DraftDefaultsConfig,
}

/// Default draft configuration
#[derive(Debug, Clone)]
pub struct DraftDefaultsConfig {
    /// Pick clock preset
    pub speed: DraftSpeed,
    /// Explicit pick clock in seconds, overrides `speed`
    pub pick_timer_secs: Option<u64>,
    /// Auto-pick attempts per pick
    pub autopick_max_attempts: u32,
    /// Consecutive auto-pick failures before the breaker opens
    pub breaker_threshold: u32,
    /// Slots per position
    pub roster_limits: RosterLimits,
}

impl DraftDefaultsConfig {
    /// Library draft configuration built from these defaults
    pub fn to_draft_config(&self) -> DraftConfig {
        DraftConfig {
            roster_limits: self.roster_limits,
            speed: self.speed,
            pick_timer_secs: self.pick_timer_secs,
            autopick_max_attempts: self.autopick_max_attempts,
            breaker_threshold: self.breaker_threshold,
        }
    }
}

impl Default for DraftDefaultsConfig {
    fn default() -> Self {
        let draft = DraftConfig::default();
        Self {
            speed: draft.speed,
            pick_timer_secs: draft.pick_timer_secs,
            autopick_max_attempts: draft.autopick_max_attempts,
            breaker_threshold: draft.breaker_threshold,
            roster_limits: draft.roster_limits,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_strict("SERVER_BIND")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 6969))),
        };

        let metrics_bind = parse_env_strict("METRICS_BIND")?;

        let development = DatabaseConfig::development();
        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or(development.database_url);

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", development.max_connections),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", development.min_connections),
            connection_timeout_secs: parse_env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                development.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", development.idle_timeout_secs),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", development.max_lifetime_secs),
        };

        let defaults = DraftDefaultsConfig::default();
        let speed = std::env::var("DRAFT_SPEED")
            .ok()
            .map(|v| {
                v.parse::<DraftSpeed>().map_err(|reason| ConfigError::Invalid {
                    var: "DRAFT_SPEED".to_string(),
                    reason,
                })
            })
            .transpose()?
            .unwrap_or(defaults.speed);

        let limits = defaults.roster_limits;
        let draft_defaults = DraftDefaultsConfig {
            speed,
            pick_timer_secs: parse_env_strict("DRAFT_PICK_TIMER_SECS")?,
            autopick_max_attempts: parse_env_or(
                "DRAFT_AUTOPICK_MAX_ATTEMPTS",
                defaults.autopick_max_attempts,
            ),
            breaker_threshold: parse_env_or("DRAFT_BREAKER_THRESHOLD", defaults.breaker_threshold),
            roster_limits: RosterLimits {
                manufacturer: parse_env_or("ROSTER_MANUFACTURER_SLOTS", limits.manufacturer),
                cannabis_strain: parse_env_or("ROSTER_STRAIN_SLOTS", limits.cannabis_strain),
                product: parse_env_or("ROSTER_PRODUCT_SLOTS", limits.product),
                pharmacy: parse_env_or("ROSTER_PHARMACY_SLOTS", limits.pharmacy),
                brand: parse_env_or("ROSTER_BRAND_SLOTS", limits.brand),
                flex: parse_env_or("ROSTER_FLEX_SLOTS", limits.flex),
            },
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            draft_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "DB_*".to_string(),
                reason,
            })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from SERVER_BIND ({})", self.bind),
            });
        }

        self.draft_defaults
            .to_draft_config()
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "DRAFT_*".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_env_strict<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
