use std::fmt;
use tracing::debug;

use super::checker::RetryChecker;
use super::checkers::{
    DEFAULT_RATE_LIMIT_STATUSES, DEFAULT_TRANSIENT_STATUSES, ExpiredAuthorizationChecker,
    MaxAttemptsChecker, RetryAfterChecker, TransientServerErrorChecker, TransportErrorChecker,
};
use super::context::RetryContext;
use super::verdict::Verdict;
use crate::config::RetryConfig;

/// Default retry budget for a logical request.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// An ordered, short-circuiting chain of [`RetryChecker`]s.
///
/// [`evaluate`](Self::evaluate) asks each checker in turn and stops at the
/// first decisive verdict. Order is precedence: a checker earlier in the chain
/// can veto or pre-empt every checker after it. If nobody has an opinion the
/// answer is [`Verdict::DoNotRetry`].
///
/// # Default Configuration
///
/// 1. [`MaxAttemptsChecker`] with 5 retries, so the budget vetoes everything
/// 2. [`ExpiredAuthorizationChecker`], which claims 401s that nothing else targets
/// 3. [`RetryAfterChecker`] for 429/503, so server backoff beats blind retry
/// 4. [`TransientServerErrorChecker`] for 429/500/502/503/504
/// 5. [`TransportErrorChecker`]
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{RetryContext, RetryPolicy, RetryState, Verdict};
/// use rebound_core::error::TransportError;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder().max_retries(2).build();
/// let mut state = RetryState::new();
/// let timeout = TransportError::Timeout(Duration::from_secs(30));
///
/// let mut context = RetryContext::new(1, &mut state).with_error(&timeout);
/// assert_eq!(policy.evaluate(&mut context), Verdict::Retry);
///
/// let mut context = RetryContext::new(3, &mut state).with_error(&timeout);
/// assert_eq!(policy.evaluate(&mut context), Verdict::DoNotRetry);
/// ```
pub struct RetryPolicy {
    checkers: Vec<Box<dyn RetryChecker>>,
}

impl RetryPolicy {
    /// Create a new builder preloaded with the default checker order.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Create a policy with exactly these checkers, in this order.
    pub fn from_checkers(checkers: Vec<Box<dyn RetryChecker>>) -> Self {
        Self { checkers }
    }

    /// Create the default checker order using the values from `config`.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::builder()
            .max_retries(config.max_retries)
            .rate_limit_statuses(config.rate_limit_statuses.iter().copied())
            .transient_statuses(config.transient_statuses.iter().copied())
            .build()
    }

    /// Decide what to do with one completed attempt.
    ///
    /// Never returns [`Verdict::Indeterminate`].
    pub fn evaluate(&self, context: &mut RetryContext<'_>) -> Verdict {
        for checker in &self.checkers {
            let verdict = checker.should_retry(context);
            if verdict.is_decisive() {
                debug!(
                    attempt = context.attempt(),
                    checker = checker.name(),
                    %verdict,
                    "retry decision"
                );
                return verdict;
            }
        }

        debug!(
            attempt = context.attempt(),
            "no checker claimed the attempt, not retrying"
        );
        Verdict::DoNotRetry
    }

    /// Names of the configured checkers, in evaluation order.
    pub fn checker_names(&self) -> Vec<&'static str> {
        self.checkers.iter().map(|c| c.name()).collect()
    }

    /// Number of configured checkers.
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    /// Whether the policy has no checkers (and therefore never retries).
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("checkers", &self.checker_names())
            .finish()
    }
}

/// Builder for [`RetryPolicy`].
///
/// Starts from the default order. The built-in checkers keep their relative
/// order; [`checker`](Self::checker) appends after them and
/// [`prepend_checker`](Self::prepend_checker) inserts ahead of all of them,
/// including the attempt budget.
pub struct RetryPolicyBuilder {
    max_retries: u32,
    rate_limit_statuses: Vec<u16>,
    transient_statuses: Vec<u16>,
    reauthorize: bool,
    leading: Vec<Box<dyn RetryChecker>>,
    trailing: Vec<Box<dyn RetryChecker>>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_statuses: DEFAULT_RATE_LIMIT_STATUSES.to_vec(),
            transient_statuses: DEFAULT_TRANSIENT_STATUSES.to_vec(),
            reauthorize: true,
            leading: Vec::new(),
            trailing: Vec::new(),
        }
    }
}

impl RetryPolicyBuilder {
    /// Set the maximum number of retries.
    ///
    /// Default: 5
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the statuses that honor `Retry-After`.
    ///
    /// Default: 429, 503
    pub fn rate_limit_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.rate_limit_statuses = statuses.into_iter().collect();
        self
    }

    /// Set the statuses retried as transient.
    ///
    /// Default: 429, 500, 502, 503, 504
    pub fn transient_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.transient_statuses = statuses.into_iter().collect();
        self
    }

    /// Enable or disable the one-shot reauthorization on 401.
    ///
    /// Default: enabled
    pub fn reauthorize(mut self, enabled: bool) -> Self {
        self.reauthorize = enabled;
        self
    }

    /// Append a checker after the built-in ones.
    pub fn checker(mut self, checker: impl RetryChecker + 'static) -> Self {
        self.trailing.push(Box::new(checker));
        self
    }

    /// Insert a checker ahead of the built-in ones.
    ///
    /// Checkers added this way run before the attempt budget is checked, so
    /// they must not answer [`Verdict::Retry`] unconditionally.
    pub fn prepend_checker(mut self, checker: impl RetryChecker + 'static) -> Self {
        self.leading.push(Box::new(checker));
        self
    }

    /// Build the policy.
    pub fn build(self) -> RetryPolicy {
        let mut checkers = self.leading;
        checkers.push(Box::new(MaxAttemptsChecker::new(self.max_retries)));
        if self.reauthorize {
            checkers.push(Box::new(ExpiredAuthorizationChecker));
        }
        checkers.push(Box::new(RetryAfterChecker::new(self.rate_limit_statuses)));
        checkers.push(Box::new(TransientServerErrorChecker::new(
            self.transient_statuses,
        )));
        checkers.push(Box::new(TransportErrorChecker));
        checkers.extend(self.trailing);

        RetryPolicy { checkers }
    }
}
