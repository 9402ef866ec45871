//! Default delay between retries when the server gives no `Retry-After`.

use serde::Deserialize;
use std::time::Duration;

use super::strategy::BackoffStrategy;

/// Doubling backoff with proportional jitter.
///
/// After failed attempt `n` (1-based) the delay is
///
/// ```text
/// initial_delay * multiplier^(n - 1) * (1 ± jitter), at most max_delay
/// ```
///
/// Out of the box that is roughly 0.5s, 1s, 2s, 4s, 8s, then 10s forever.
///
/// ```rust
/// use rebound_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(250))
///     .jitter(0.0)
///     .build();
///
/// assert_eq!(backoff.next_delay(1), Duration::from_millis(250));
/// assert_eq!(backoff.next_delay(3), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExponentialBackoff {
    #[serde(with = "crate::config::secs_f64")]
    initial_delay: Duration,
    #[serde(with = "crate::config::secs_f64")]
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Start from the defaults and override what you need.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder {
            backoff: Self::default(),
        }
    }

    /// Delay after the first failure, before jitter.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// No delay is ever longer than this.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Fraction of the delay that is randomized, in `0.0..=1.0`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn unjittered_secs(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        let mut secs = self.unjittered_secs(attempt);
        if self.jitter > 0.0 {
            // uniform in [-jitter, +jitter]
            let spread = (rand::random::<f64>() * 2.0 - 1.0) * self.jitter;
            secs *= 1.0 + spread;
        }

        let secs = secs.clamp(0.0, self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }
}

/// Builder for [`ExponentialBackoff`].
#[derive(Debug, Clone)]
pub struct ExponentialBackoffBuilder {
    backoff: ExponentialBackoff,
}

impl ExponentialBackoffBuilder {
    /// Delay after the first failed attempt. Default 500ms.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.backoff.initial_delay = delay;
        self
    }

    /// Upper bound for any delay. Default 10s.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    /// Growth factor. Default 2.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.backoff.multiplier = multiplier;
        self
    }

    /// Randomized fraction, clamped to `0.0..=1.0`. Default 0.1.
    ///
    /// `0.25` lets each delay land anywhere within ±25% of its nominal value.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.backoff.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Finish building.
    pub fn build(self) -> ExponentialBackoff {
        self.backoff
    }
}
