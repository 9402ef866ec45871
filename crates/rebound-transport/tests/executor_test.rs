//! Retry loop tests against a scripted in-memory transport
//!
//! Time is paused, so waits complete instantly while `tokio::time::Instant`
//! still records exactly how long the executor slept.

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use rebound_core::auth::{AccessTokenAuthorizer, Authorizer, RefreshingAuthorizer};
use rebound_core::config::RetryConfig;
use rebound_core::retry::{ExponentialBackoff, RetryPolicy};
use rebound_transport::{HttpRequest, HttpResponse, RetryExecutor, Transport, TransportError};

/// Replays a fixed list of outcomes and records every request it was given.
struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn authorization_headers(&self) -> Vec<Option<String>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.header("authorization").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted")
    }
}

fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code, HeaderMap::new(), Vec::new()))
}

fn rate_limited(code: u16, retry_after: &'static str) -> Result<HttpResponse, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert("Retry-After", HeaderValue::from_static(retry_after));
    Ok(HttpResponse::new(code, headers, Vec::new()))
}

fn fixed_backoff(delay: Duration) -> ExponentialBackoff {
    ExponentialBackoff::builder()
        .initial_delay(delay)
        .multiplier(1.0)
        .jitter(0.0)
        .build()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn request() -> HttpRequest {
    HttpRequest::new("GET", "https://api.example.org/v1/items")
}

#[tokio::test(start_paused = true)]
async fn test_500_then_retry_after_then_success() {
    init_tracing();
    let transport = ScriptedTransport::new(vec![
        status(500),
        rate_limited(429, "2"),
        status(200),
    ]);
    let executor = RetryExecutor::new(transport)
        .with_policy(RetryPolicy::builder().max_retries(3).build())
        .with_backoff(fixed_backoff(Duration::from_millis(500)));

    let start = Instant::now();
    let response = executor.execute(request(), None).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(executor.transport().calls(), 3);
    // 500ms default backoff after the 500, then the 2s the server asked for
    assert_eq!(start.elapsed(), Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_surfaces_last_response() {
    let transport = ScriptedTransport::new(vec![status(503), status(503), status(503)]);
    let executor = RetryExecutor::new(transport)
        .with_policy(RetryPolicy::builder().max_retries(2).build())
        .with_backoff(fixed_backoff(Duration::from_millis(10)));

    let response = executor.execute(request(), None).await.unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(executor.transport().calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_status_returns_immediately() {
    let transport = ScriptedTransport::new(vec![status(404)]);
    let executor = RetryExecutor::new(transport);

    let response = executor.execute(request(), None).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(executor.transport().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout(Duration::from_secs(30))),
        Err(TransportError::Connection("connection reset by peer".into())),
        Err(TransportError::Encoding("invalid utf-8".into())),
    ]);
    let executor = RetryExecutor::new(transport)
        .with_backoff(fixed_backoff(Duration::from_millis(1)));

    let error = executor.execute(request(), None).await.unwrap_err();

    assert!(matches!(error, TransportError::Encoding(_)));
    assert_eq!(executor.transport().calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reauthorizes_once_and_sends_new_token() {
    let refreshes = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&refreshes);
    let authorizer: Arc<dyn Authorizer> = Arc::new(RefreshingAuthorizer::new("stale", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("fresh".to_string())
    }));

    let transport = ScriptedTransport::new(vec![status(401), status(401)]);
    let executor = RetryExecutor::new(transport);

    let response = executor.execute(request(), Some(Arc::clone(&authorizer))).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(
        executor.transport().authorization_headers(),
        vec![
            Some("Bearer stale".to_string()),
            Some("Bearer fresh".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_surfaces_401() {
    init_tracing();
    let authorizer: Arc<dyn Authorizer> = Arc::new(RefreshingAuthorizer::new("stale", || {
        Err(anyhow::anyhow!("refresh token revoked"))
    }));
    let transport = ScriptedTransport::new(vec![status(401)]);
    let executor = RetryExecutor::new(transport);

    let response = executor.execute(request(), Some(Arc::clone(&authorizer))).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(executor.transport().calls(), 1);
}

/// A refresh that blocks for a while must not stall other tasks on the runtime.
#[tokio::test]
async fn test_slow_refresh_does_not_block_the_runtime() {
    let authorizer: Arc<dyn Authorizer> = Arc::new(RefreshingAuthorizer::new("stale", || {
        std::thread::sleep(Duration::from_millis(300));
        Ok("fresh".to_string())
    }));
    let transport = ScriptedTransport::new(vec![status(401), status(200)]);
    let executor =
        RetryExecutor::new(transport).with_backoff(fixed_backoff(Duration::from_millis(1)));

    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let response = executor
        .execute(request(), Some(Arc::clone(&authorizer)))
        .await
        .unwrap();
    let ticked = ticks.load(Ordering::SeqCst);
    ticker.abort();

    assert_eq!(response.status, 200);
    assert_eq!(
        executor.transport().authorization_headers(),
        vec![
            Some("Bearer stale".to_string()),
            Some("Bearer fresh".to_string()),
        ]
    );
    // roughly 30 ticks fit into the refresh; a stalled runtime manages at most one
    assert!(ticked >= 10, "ticker ran only {ticked} times during the refresh");
}

#[tokio::test(start_paused = true)]
async fn test_each_logical_request_gets_its_own_reauthorization() {
    let authorizer: Arc<dyn Authorizer> =
        Arc::new(RefreshingAuthorizer::new("t0", || Ok("t1".to_string())));
    let transport = ScriptedTransport::new(vec![status(401), status(200), status(401), status(200)]);
    let executor = RetryExecutor::new(transport);

    let first = executor.execute(request(), Some(Arc::clone(&authorizer))).await.unwrap();
    let second = executor.execute(request(), Some(Arc::clone(&authorizer))).await.unwrap();

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);
    assert_eq!(executor.transport().calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_static_token_401_is_not_retried() {
    let authorizer: Arc<dyn Authorizer> = Arc::new(AccessTokenAuthorizer::new("abc"));
    let transport = ScriptedTransport::new(vec![status(401)]);
    let executor = RetryExecutor::new(transport);

    let response = executor.execute(request(), Some(Arc::clone(&authorizer))).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(
        executor.transport().authorization_headers(),
        vec![Some(authorizer.authorization_header().unwrap())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_waits_are_capped_by_max_sleep() {
    let transport = ScriptedTransport::new(vec![rate_limited(503, "3600"), status(200)]);
    let executor = RetryExecutor::new(transport).with_max_sleep(Duration::from_secs(5));

    let start = Instant::now();
    let response = executor.execute(request(), None).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_zero_retries_without_waiting() {
    let transport = ScriptedTransport::new(vec![rate_limited(429, "0"), status(200)]);
    let executor = RetryExecutor::new(transport);

    let start = Instant::now();
    let response = executor.execute(request(), None).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_wait() {
    let transport = ScriptedTransport::new(vec![rate_limited(429, "60"), status(200)]);
    let executor = RetryExecutor::new(transport).with_max_sleep(Duration::from_secs(60));

    let cancel = tokio::time::sleep(Duration::from_secs(1));
    let error = executor
        .execute_with_cancel(request(), None, cancel)
        .await
        .unwrap_err();

    assert!(matches!(error, TransportError::Cancelled { attempts: 1 }));
    assert_eq!(executor.transport().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_from_config() {
    let config = RetryConfig {
        max_retries: 1,
        transient_statuses: vec![500],
        ..RetryConfig::default()
    };
    let transport = ScriptedTransport::new(vec![status(502), status(500), status(500)]);
    let executor = RetryExecutor::from_config(transport, &config);

    // 502 is no longer transient under this configuration
    let response = executor.execute(request(), None).await.unwrap();
    assert_eq!(response.status, 502);

    // 500 is retried once, then the budget is spent
    let response = executor.execute(request(), None).await.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(executor.transport().calls(), 3);
}
