//! Transport trait and request type
//!
//! Defines the single-send [`Transport`] interface the retry executor drives.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::Result;
use rebound_core::response::HttpResponse;

/// One logical request.
///
/// Cheap to clone: the executor resends it on every attempt, replacing only
/// the `Authorization` header.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,

    /// Request URL
    pub url: String,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Request body (optional)
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Add a header to the request
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body from string
    pub fn with_text_body(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Bytes::from(text.into()));
        self
    }

    /// Get a header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value regardless of name case
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(key));
        self.headers.insert(key.to_string(), value.into());
    }
}

/// A mechanism that performs one physical send.
///
/// Implementations must not retry: every call is exactly one attempt, and a
/// failure is reported as a [`TransportError`](crate::TransportError) that the
/// retry checkers can classify.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an HTTP request and receive a response
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send_http(request).await
    }
}
