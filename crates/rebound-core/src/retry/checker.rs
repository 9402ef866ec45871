use super::context::RetryContext;
use super::verdict::Verdict;

/// A single rule contributing one opinion to a retry decision.
///
/// Checkers are pure decision functions: they must not sleep, perform I/O or
/// hold shared mutable state. The only permitted side effects are writing
/// idempotent, named flags into [`RetryContext::state_mut`] and invoking the
/// authorizer's refresh capability.
///
/// A checker that cannot make sense of its input should panic. Evaluation
/// failures are programming errors and are never turned into a verdict.
///
/// Functions and closures with the right signature are checkers too:
///
/// ```rust
/// use rebound_core::retry::{RetryContext, RetryPolicy, Verdict};
///
/// fn never_on_404(context: &mut RetryContext<'_>) -> Verdict {
///     match context.status() {
///         Some(404) => Verdict::DoNotRetry,
///         _ => Verdict::Indeterminate,
///     }
/// }
///
/// let policy = RetryPolicy::builder().checker(never_on_404).build();
/// assert_eq!(policy.len(), 6);
/// ```
pub trait RetryChecker: Send + Sync {
    /// Evaluate one completed attempt.
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict;

    /// Name used in log events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("RetryChecker")
    }
}

impl<F> RetryChecker for F
where
    F: Fn(&mut RetryContext<'_>) -> Verdict + Send + Sync,
{
    fn should_retry(&self, context: &mut RetryContext<'_>) -> Verdict {
        self(context)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}
