use std::fmt;
use std::time::Duration;

/// Outcome of evaluating a [`RetryContext`](super::RetryContext).
///
/// `Indeterminate` is a real answer ("no opinion"), not an absence: a policy
/// keeps asking later checkers only while it sees this variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Send the request again after the executor's default backoff.
    Retry,
    /// Stop and surface the current attempt's outcome.
    DoNotRetry,
    /// No opinion; defer to the next checker.
    Indeterminate,
    /// Send the request again after exactly this delay.
    RetryAfter(Duration),
}

impl Verdict {
    /// Whether this verdict asks for another attempt.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry | Self::RetryAfter(_))
    }

    /// Whether this verdict settles the decision.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, Self::Indeterminate)
    }
}

impl From<bool> for Verdict {
    fn from(retry: bool) -> Self {
        if retry { Self::Retry } else { Self::DoNotRetry }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(opinion: Option<bool>) -> Self {
        opinion.map_or(Self::Indeterminate, Self::from)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => f.write_str("retry"),
            Self::DoNotRetry => f.write_str("do not retry"),
            Self::Indeterminate => f.write_str("indeterminate"),
            Self::RetryAfter(delay) => write!(f, "retry after {delay:?}"),
        }
    }
}
