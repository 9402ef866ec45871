//! Retry configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_STATUSES, DEFAULT_TRANSIENT_STATUSES,
    ExponentialBackoff,
};

const DEFAULT_MAX_SLEEP: Duration = Duration::from_secs(10);

/// Construction-time settings for a retry policy and its executor.
///
/// Deserializes from any serde format; missing fields take their defaults and
/// durations are written as seconds:
///
/// ```toml
/// max_retries = 3
/// transient_statuses = [500, 502, 503, 504]
/// max_sleep = 30.0
///
/// [backoff]
/// initial_delay = 0.25
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Statuses whose `Retry-After` header is honored
    pub rate_limit_statuses: Vec<u16>,

    /// Statuses retried with the default backoff
    pub transient_statuses: Vec<u16>,

    /// Upper bound on any single wait, including server-requested ones
    #[serde(with = "secs_f64")]
    pub max_sleep: Duration,

    /// Default backoff for plain retries
    pub backoff: ExponentialBackoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_statuses: DEFAULT_RATE_LIMIT_STATUSES.to_vec(),
            transient_statuses: DEFAULT_TRANSIENT_STATUSES.to_vec(),
            max_sleep: DEFAULT_MAX_SLEEP,
            backoff: ExponentialBackoff::default(),
        }
    }
}

impl RetryConfig {
    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `REBOUND_MAX_RETRIES` for the retry budget
    /// - `REBOUND_MAX_SLEEP_SECS` for the longest single wait (in seconds)
    /// - `REBOUND_RATE_LIMIT_STATUSES` as a comma-separated status list
    /// - `REBOUND_TRANSIENT_STATUSES` as a comma-separated status list
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        let mut config = Self::default();

        if let Ok(raw) = env::var("REBOUND_MAX_RETRIES") {
            config.max_retries = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "REBOUND_MAX_RETRIES",
                value: raw.clone(),
            })?;
        }

        if let Ok(raw) = env::var("REBOUND_MAX_SLEEP_SECS") {
            config.max_sleep = raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| ConfigError::InvalidEnv {
                    var: "REBOUND_MAX_SLEEP_SECS",
                    value: raw.clone(),
                })?;
        }

        if let Ok(raw) = env::var("REBOUND_RATE_LIMIT_STATUSES") {
            config.rate_limit_statuses = parse_statuses("REBOUND_RATE_LIMIT_STATUSES", &raw)?;
        }

        if let Ok(raw) = env::var("REBOUND_TRANSIENT_STATUSES") {
            config.transient_statuses = parse_statuses("REBOUND_TRANSIENT_STATUSES", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or holds invalid statuses.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Check statuses and backoff parameters.
    ///
    /// Documents bypass the backoff builder, so its ranges are enforced here:
    /// `jitter` must lie in `0.0..=1.0` and `multiplier` must be finite and
    /// non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStatus`] for the first code outside 100..=599,
    /// or [`ConfigError::InvalidBackoff`] for an unusable backoff parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(status) = self
            .rate_limit_statuses
            .iter()
            .chain(&self.transient_statuses)
            .find(|status| !(100..=599).contains(*status))
        {
            return Err(ConfigError::InvalidStatus(*status));
        }

        let jitter = self.backoff.jitter();
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::InvalidBackoff {
                field: "jitter",
                value: jitter,
            });
        }
        let multiplier = self.backoff.multiplier();
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(ConfigError::InvalidBackoff {
                field: "multiplier",
                value: multiplier,
            });
        }
        Ok(())
    }

    /// Merge this configuration with another, with the other taking precedence.
    ///
    /// A field of `other` wins only when it differs from the default.
    pub fn merge(mut self, other: RetryConfig) -> Self {
        let defaults = Self::default();
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if other.rate_limit_statuses != defaults.rate_limit_statuses {
            self.rate_limit_statuses = other.rate_limit_statuses;
        }
        if other.transient_statuses != defaults.transient_statuses {
            self.transient_statuses = other.transient_statuses;
        }
        if other.max_sleep != defaults.max_sleep {
            self.max_sleep = other.max_sleep;
        }
        if other.backoff != defaults.backoff {
            self.backoff = other.backoff;
        }
        self
    }
}

fn parse_statuses(var: &'static str, raw: &str) -> Result<Vec<u16>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                var,
                value: raw.to_string(),
            })
        })
        .collect()
}

/// Serde adapter for durations written as (fractional) seconds.
pub(crate) mod secs_f64 {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
