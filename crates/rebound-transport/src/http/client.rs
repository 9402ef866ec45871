//! reqwest-backed [`Transport`].

use ::http::{HeaderName, HeaderValue};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Result, TransportError, classify_reqwest_error};
use crate::traits::{HttpRequest, Transport};
use rebound_core::response::HttpResponse;

/// Knobs for the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Whole-request deadline, reported as [`TransportError::Timeout`]
    pub timeout: Duration,

    /// Deadline for establishing a connection
    pub connect_timeout: Duration,

    /// Idle keep-alive connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
        }
    }
}

/// Sends each [`HttpRequest`] exactly once over a pooled reqwest client.
///
/// Cloning is cheap and clones share the pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Transport with [`HttpTransportConfig::default`].
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Transport with explicit pool settings.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("cannot build client: {e}")))?;

        Ok(Self { client, config })
    }

    /// The pool settings this transport was built with.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn prepare(&self, request: &HttpRequest) -> Result<RequestBuilder> {
        let method = parse_method(&request.method)?;
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidRequest(format!("bad url {:?}: {e}", request.url)))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            let (name, value) = parse_header(name, value)?;
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| TransportError::InvalidRequest(format!("bad method {method:?}")))
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TransportError::InvalidRequest(format!("bad header name {name:?}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| TransportError::InvalidRequest(format!("bad value for header {name}")))?;
    Ok((header_name, header_value))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse> {
        let builder = self.prepare(&request)?;
        debug!(method = %request.method, url = %request.url, "sending");

        let timeout = self.config.timeout;
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        debug!(status, bytes = body.len(), "received");
        Ok(HttpResponse::new(status, headers, body))
    }
}
