//! Built-in retry checkers.

use std::time::Duration;
use tracing::{debug, info};

use super::checker::RetryChecker;
use super::context::RetryContext;
use super::state::HAS_DONE_REAUTH;
use super::verdict::Verdict;
use crate::response::HttpResponse;

/// Statuses that may carry a `Retry-After` header.
pub const DEFAULT_RATE_LIMIT_STATUSES: &[u16] = &[429, 503];

/// Statuses that usually resolve on their own.
pub const DEFAULT_TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

const UNAUTHORIZED: u16 = 401;

/// Vetoes every retry once the attempt budget is spent.
///
/// With `max_retries = n` a logical request is sent at most `n + 1` times:
/// attempts `1..=n` may be retried, attempt `n + 1` may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAttemptsChecker {
    max_retries: u32,
}

impl MaxAttemptsChecker {
    /// Create a checker allowing `max_retries` retries.
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The configured retry budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for MaxAttemptsChecker {
    fn default() -> Self {
        Self::new(super::policy::DEFAULT_MAX_RETRIES)
    }
}

impl RetryChecker for MaxAttemptsChecker {
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        if context.attempt() > self.max_retries {
            Verdict::DoNotRetry
        } else {
            Verdict::Indeterminate
        }
    }
}

/// Retries network failures and refuses every other transport error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportErrorChecker;

impl RetryChecker for TransportErrorChecker {
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        match context.error() {
            Some(error) => Verdict::from(error.is_network()),
            None => Verdict::Indeterminate,
        }
    }
}

/// Honors server-specified backoff on rate-limited responses.
///
/// `Retry-After` is read as a non-negative integer count of seconds. An HTTP
/// date or any other text counts as absent, in which case the executor's
/// default backoff applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAfterChecker {
    statuses: Vec<u16>,
}

impl RetryAfterChecker {
    /// Create a checker for the given rate-limit statuses.
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Statuses this checker applies to.
    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }

    /// Parse the `Retry-After` header of `response`.
    ///
    /// Returns `None` when the header is missing or is not a plain decimal
    /// number of seconds. Zero is a valid value.
    pub fn parse_retry_after(response: &HttpResponse) -> Option<Duration> {
        let value = response.header(http::header::RETRY_AFTER.as_str())?.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

impl Default for RetryAfterChecker {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_STATUSES.iter().copied())
    }
}

impl RetryChecker for RetryAfterChecker {
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        let Some(response) = context.response() else {
            return Verdict::Indeterminate;
        };
        if !self.statuses.contains(&response.status) {
            return Verdict::Indeterminate;
        }
        match Self::parse_retry_after(response) {
            Some(delay) => Verdict::RetryAfter(delay),
            None => Verdict::Retry,
        }
    }
}

/// Retries statuses that normally clear up without client changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientServerErrorChecker {
    statuses: Vec<u16>,
}

impl TransientServerErrorChecker {
    /// Create a checker for the given transient statuses.
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Statuses this checker applies to.
    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }
}

impl Default for TransientServerErrorChecker {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_STATUSES.iter().copied())
    }
}

impl RetryChecker for TransientServerErrorChecker {
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        match context.status() {
            Some(status) if self.statuses.contains(&status) => Verdict::Retry,
            _ => Verdict::Indeterminate,
        }
    }
}

/// Refreshes credentials once per logical request on a 401.
///
/// Never answers `DoNotRetry`: when reauthorization is not possible it stays
/// silent so that later checkers may still claim the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredAuthorizationChecker;

impl RetryChecker for ExpiredAuthorizationChecker {
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        if context.status() != Some(UNAUTHORIZED) {
            return Verdict::Indeterminate;
        }
        let Some(authorizer) = context.authorizer() else {
            return Verdict::Indeterminate;
        };
        if context.state().flag(HAS_DONE_REAUTH) {
            debug!(
                attempt = context.attempt(),
                "401 after reauthorization, not refreshing again"
            );
            return Verdict::Indeterminate;
        }

        if !authorizer.attempt_credential_refresh() {
            debug!(attempt = context.attempt(), "authorizer could not refresh credentials");
            return Verdict::Indeterminate;
        }

        info!(attempt = context.attempt(), "credentials refreshed after 401");
        context.state_mut().set_flag(HAS_DONE_REAUTH);
        Verdict::Retry
    }
}
