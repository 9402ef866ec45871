use std::time::Duration;

/// How long to wait before resending after a plain [`Verdict::Retry`].
///
/// A [`Verdict::RetryAfter`] carries its own delay and bypasses the strategy.
/// Implementations only compute durations; sleeping belongs to the executor.
///
/// [`Verdict::Retry`]: super::Verdict::Retry
/// [`Verdict::RetryAfter`]: super::Verdict::RetryAfter
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// /// Waits the same amount after every failure.
/// struct Constant(Duration);
///
/// impl BackoffStrategy for Constant {
///     fn next_delay(&self, _attempt: u32) -> Duration {
///         self.0
///     }
/// }
///
/// assert_eq!(Constant(Duration::from_secs(1)).next_delay(4), Duration::from_secs(1));
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Delay to apply after attempt number `attempt` (1-based) failed.
    fn next_delay(&self, attempt: u32) -> Duration;
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for std::sync::Arc<S> {
    fn next_delay(&self, attempt: u32) -> Duration {
        (**self).next_delay(attempt)
    }
}
