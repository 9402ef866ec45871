//! The retry loop.
//!
//! [`RetryExecutor`] owns everything the decision engine refuses to do: it
//! sends, numbers attempts, keeps the per-request [`RetryState`], sleeps
//! between attempts and honors cancellation while it waits.
//!
//! Credential refresh is synchronous and may block, so whenever an
//! authorizer is attached the policy runs on tokio's blocking pool.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, Transport};
use rebound_core::auth::Authorizer;
use rebound_core::config::RetryConfig;
use rebound_core::response::HttpResponse;
use rebound_core::retry::{
    BackoffStrategy, ExponentialBackoff, RetryContext, RetryPolicy, RetryState, Verdict,
};

const DEFAULT_MAX_SLEEP: Duration = Duration::from_secs(10);

/// Drives logical requests through a [`Transport`] under a [`RetryPolicy`].
///
/// Each call to [`execute`](Self::execute) is one logical request: attempts
/// are numbered from 1, a fresh [`RetryState`] is created, and the policy is
/// consulted once after every completed attempt, successful or not.
///
/// The logical request ends with:
/// - `Ok(response)` when the policy stops on a response, whatever its status
/// - `Err(error)` when the policy stops on a transport error
/// - `Err(TransportError::Cancelled)` when cancelled during a wait
///
/// # Delays
///
/// - [`Verdict::Retry`] waits for the backoff strategy's delay
/// - [`Verdict::RetryAfter`] waits for exactly the server-requested delay
///
/// Both are capped at `max_sleep` (default 10s).
///
/// # Examples
///
/// ```ignore
/// use rebound_transport::{HttpRequest, HttpTransport, RetryExecutor};
/// use rebound_core::config::RetryConfig;
///
/// let config = RetryConfig::from_env()?;
/// let executor = RetryExecutor::from_config(HttpTransport::new()?, &config);
/// let response = executor
///     .execute(HttpRequest::new("GET", "https://api.example.org/v1/items"), None)
///     .await?;
/// ```
pub struct RetryExecutor<T> {
    transport: T,
    policy: Arc<RetryPolicy>,
    backoff: Arc<dyn BackoffStrategy>,
    max_sleep: Duration,
}

impl<T: Transport> RetryExecutor<T> {
    /// Create an executor with the default policy and backoff.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: Arc::new(RetryPolicy::default()),
            backoff: Arc::new(ExponentialBackoff::default()),
            max_sleep: DEFAULT_MAX_SLEEP,
        }
    }

    /// Create an executor whose policy, backoff and sleep cap come from `config`.
    pub fn from_config(transport: T, config: &RetryConfig) -> Self {
        Self {
            transport,
            policy: Arc::new(RetryPolicy::from_config(config)),
            backoff: Arc::new(config.backoff.clone()),
            max_sleep: config.max_sleep,
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the default backoff strategy.
    pub fn with_backoff(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Set the longest single wait between attempts.
    pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one logical request to completion.
    ///
    /// The authorizer is shared with the blocking pool while a 401 is being
    /// evaluated, hence the `Arc`.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`TransportError`] when the policy gives up
    /// on a transport failure.
    pub async fn execute(
        &self,
        request: HttpRequest,
        authorizer: Option<Arc<dyn Authorizer>>,
    ) -> Result<HttpResponse> {
        self.execute_with_cancel(request, authorizer, std::future::pending())
            .await
    }

    /// Run one logical request, abandoning it if `cancel` completes during a wait.
    ///
    /// Cancellation is only observed between attempts; an attempt already in
    /// flight runs to completion first.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`TransportError::Cancelled`].
    pub async fn execute_with_cancel<C>(
        &self,
        request: HttpRequest,
        authorizer: Option<Arc<dyn Authorizer>>,
        cancel: C,
    ) -> Result<HttpResponse>
    where
        C: Future<Output = ()> + Send,
    {
        let span = info_span!(
            "logical_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        self.run(request, authorizer, cancel).instrument(span).await
    }

    async fn run<C>(
        &self,
        mut request: HttpRequest,
        authorizer: Option<Arc<dyn Authorizer>>,
        cancel: C,
    ) -> Result<HttpResponse>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);
        let started = Instant::now();
        let mut state = RetryState::new();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if let Some(header) = authorizer.as_ref().and_then(|a| a.authorization_header()) {
                request.set_header("Authorization", header);
            }

            debug!(attempt, "sending attempt");
            let outcome = self.transport.send_http(request.clone()).await;
            let (verdict, outcome) = match &authorizer {
                Some(authorizer) => {
                    let evaluated = self
                        .decide_blocking(attempt, outcome, Arc::clone(authorizer), state)
                        .await?;
                    state = evaluated.state;
                    (evaluated.verdict, evaluated.outcome)
                }
                None => (decide(&self.policy, attempt, &outcome, None, &mut state), outcome),
            };

            let delay = match verdict {
                Verdict::Retry => self.backoff.next_delay(attempt),
                Verdict::RetryAfter(delay) => delay,
                Verdict::DoNotRetry | Verdict::Indeterminate => {
                    log_finished(&outcome, attempt, started.elapsed());
                    return outcome;
                }
            };
            let delay = delay.min(self.max_sleep);

            match &outcome {
                Ok(response) => warn!(
                    attempt,
                    status = response.status,
                    delay_ms = millis(delay),
                    "retrying after response"
                ),
                Err(error) => warn!(
                    attempt,
                    %error,
                    delay_ms = millis(delay),
                    "retrying after transport error"
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut cancel => {
                    info!(attempt, "logical request cancelled while waiting to retry");
                    return Err(TransportError::Cancelled { attempts: attempt });
                }
            }
        }
    }

    /// Evaluate the policy on the blocking pool so a slow credential refresh
    /// cannot stall the async workers.
    async fn decide_blocking(
        &self,
        attempt: u32,
        outcome: Result<HttpResponse>,
        authorizer: Arc<dyn Authorizer>,
        mut state: RetryState,
    ) -> Result<Evaluated> {
        let policy = Arc::clone(&self.policy);
        let span = Span::current();
        let joined = tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                let verdict = decide(&policy, attempt, &outcome, Some(&*authorizer), &mut state);
                Evaluated {
                    verdict,
                    outcome,
                    state,
                }
            })
        })
        .await;

        match joined {
            Ok(evaluated) => Ok(evaluated),
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Err(TransportError::Cancelled { attempts: attempt }),
        }
    }
}

/// Owned results handed back from the blocking pool.
struct Evaluated {
    verdict: Verdict,
    outcome: Result<HttpResponse>,
    state: RetryState,
}

fn decide(
    policy: &RetryPolicy,
    attempt: u32,
    outcome: &Result<HttpResponse>,
    authorizer: Option<&dyn Authorizer>,
    state: &mut RetryState,
) -> Verdict {
    let context = RetryContext::new(attempt, state);
    let context = match outcome {
        Ok(response) => context.with_response(response),
        Err(error) => context.with_error(error),
    };
    let mut context = match authorizer {
        Some(authorizer) => context.with_authorizer(authorizer),
        None => context,
    };
    policy.evaluate(&mut context)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn log_finished(outcome: &Result<HttpResponse>, attempts: u32, elapsed: Duration) {
    let elapsed_ms = millis(elapsed);
    match outcome {
        Ok(response) if response.is_success() => {
            info!(status = response.status, attempts, elapsed_ms, "HTTP request succeeded")
        }
        Ok(response) => warn!(
            status = response.status,
            attempts, elapsed_ms, "HTTP request finished with error status"
        ),
        Err(error) => warn!(%error, attempts, elapsed_ms, "HTTP request failed"),
    }
}
