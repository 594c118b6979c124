//! Configuration types

use crate::{ConfigError, RefDataError, RefDataResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STALE CHECK POLICY
// ============================================================================

/// Staleness-check policy applied by the insert path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StaleCheck {
    /// Insert unconditionally.
    #[default]
    None,
    /// Compare against the live cache as it currently stands.
    FromLiveCache,
    /// Reload the live cache, then compare.
    FromLiveCacheForceRefresh,
}

impl StaleCheck {
    /// Convert to configuration string representation.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            StaleCheck::None => "none",
            StaleCheck::FromLiveCache => "from_live_cache",
            StaleCheck::FromLiveCacheForceRefresh => "from_live_cache_force_refresh",
        }
    }

    /// Parse from configuration string representation.
    pub fn from_config_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(StaleCheck::None),
            "from_live_cache" => Ok(StaleCheck::FromLiveCache),
            "from_live_cache_force_refresh" => Ok(StaleCheck::FromLiveCacheForceRefresh),
            _ => Err(ConfigError::InvalidValue {
                field: "stale_check".to_string(),
                value: s.to_string(),
                reason: "expected none, from_live_cache or from_live_cache_force_refresh"
                    .to_string(),
            }),
        }
    }

    /// Whether the policy consults the live cache at all.
    pub fn consults_cache(&self) -> bool {
        !matches!(self, StaleCheck::None)
    }

    /// Whether the policy reloads the live cache before comparing.
    pub fn forces_refresh(&self) -> bool {
        matches!(self, StaleCheck::FromLiveCacheForceRefresh)
    }
}

impl fmt::Display for StaleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}

impl FromStr for StaleCheck {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_config_str(s)
    }
}

// ============================================================================
// MASTER CONFIG
// ============================================================================

/// Writer identity used when nothing else is configured.
pub const DEFAULT_WRITER: &str = "refdata";

/// Session configuration for the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefDataConfig {
    /// Identity recorded as `last_updated_by` on every version this session writes.
    pub writer: String,
    /// Staleness-check policy for inserts.
    pub stale_check: StaleCheck,
}

impl Default for RefDataConfig {
    fn default() -> Self {
        Self {
            writer: DEFAULT_WRITER.to_string(),
            stale_check: StaleCheck::default(),
        }
    }
}

impl RefDataConfig {
    /// Create a config for the given writer with no staleness check.
    pub fn new(writer: impl Into<String>) -> Self {
        Self {
            writer: writer.into(),
            stale_check: StaleCheck::default(),
        }
    }

    /// Set the staleness-check policy.
    pub fn with_stale_check(mut self, stale_check: StaleCheck) -> Self {
        self.stale_check = stale_check;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `REFDATA_WRITER`: writer identity (default: `USER`, then `USERNAME`, then `refdata`)
    /// - `REFDATA_STALE_CHECK`: `none`, `from_live_cache` or
    ///   `from_live_cache_force_refresh` (default: `none`)
    ///
    /// An unrecognised `REFDATA_STALE_CHECK` is an error rather than a
    /// silent fallback to `none`.
    pub fn from_env() -> RefDataResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> RefDataResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let writer = ["REFDATA_WRITER", "USER", "USERNAME"]
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.trim().is_empty())
            .unwrap_or(defaults.writer);

        let stale_check = match lookup("REFDATA_STALE_CHECK") {
            Some(raw) if !raw.trim().is_empty() => raw.parse::<StaleCheck>()?,
            _ => defaults.stale_check,
        };

        let config = Self {
            writer,
            stale_check,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - writer is non-empty
    pub fn validate(&self) -> RefDataResult<()> {
        if self.writer.trim().is_empty() {
            return Err(RefDataError::Config(ConfigError::MissingRequired {
                field: "writer".to_string(),
            }));
        }

        Ok(())
    }
}
