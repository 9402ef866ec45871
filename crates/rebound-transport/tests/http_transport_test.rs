//! Integration tests for the HTTP transport and retry executor using wiremock

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rebound_core::auth::{Authorizer, RefreshingAuthorizer};
use rebound_core::retry::{ExponentialBackoff, RetryPolicy};
use rebound_transport::{
    HttpRequest, HttpTransport, HttpTransportConfig, RetryExecutor, Transport, TransportError,
};

fn quick_backoff() -> ExponentialBackoff {
    ExponentialBackoff::builder()
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .jitter(0.0)
        .build()
}

fn executor(max_retries: u32) -> RetryExecutor<HttpTransport> {
    let transport = HttpTransport::new().expect("Failed to create HTTP transport");
    RetryExecutor::new(transport)
        .with_policy(RetryPolicy::builder().max_retries(max_retries).build())
        .with_backoff(quick_backoff())
}

#[tokio::test]
async fn test_single_send_returns_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/items"))
        .and(body_string("{\"name\":\"widget\"}"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-request-id", "abc123")
                .set_body_string("{\"id\":7}"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("Failed to create HTTP transport");
    let request = HttpRequest::new("post", format!("{}/v1/items", server.uri()))
        .with_header("Content-Type", "application/json")
        .with_text_body("{\"name\":\"widget\"}");

    let response = transport.send_http(request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.header("X-Request-Id"), Some("abc123"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn test_transport_does_not_retry_on_its_own() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("Failed to create HTTP transport");
    let response = transport
        .send_http(HttpRequest::new("GET", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn test_executor_recovers_from_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let response = executor(3)
        .execute(HttpRequest::new("GET", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "ok");
}

#[tokio::test]
async fn test_executor_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = executor(1)
        .execute(HttpRequest::new("GET", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_executor_returns_final_error_status_when_budget_is_spent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let response = executor(2)
        .execute(HttpRequest::new("GET", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(response.status, 502);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let response = executor(5)
        .execute(HttpRequest::new("GET", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_resent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer: Arc<dyn Authorizer> =
        Arc::new(RefreshingAuthorizer::new("expired", || Ok("renewed".to_string())));
    let response = executor(3)
        .execute(HttpRequest::new("GET", server.uri()), Some(authorizer))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_connection_refused_is_retried_then_surfaced() {
    // Bind and release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = HttpTransportConfig {
        connect_timeout: Duration::from_secs(2),
        ..HttpTransportConfig::default()
    };
    let transport = HttpTransport::with_config(config).unwrap();
    let executor = RetryExecutor::new(transport)
        .with_policy(RetryPolicy::builder().max_retries(2).build())
        .with_backoff(quick_backoff());

    let error = executor
        .execute(HttpRequest::new("GET", format!("http://{addr}/")), None)
        .await
        .unwrap_err();

    assert!(error.is_network(), "unexpected error: {error:?}");
}

#[tokio::test]
async fn test_invalid_request_is_not_retried() {
    let error = executor(5)
        .execute(HttpRequest::new("GET", "not a url"), None)
        .await
        .unwrap_err();

    assert!(matches!(error, TransportError::InvalidRequest(_)));
}
