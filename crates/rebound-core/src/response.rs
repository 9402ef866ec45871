//! HTTP response as seen by the retry engine.

use bytes::Bytes;
use http::HeaderMap;

use crate::error::{TransportError, TransportResult};

/// HTTP response
///
/// Represents a completed physical send. Checkers read the status and headers;
/// the body is carried through so the final response can be handed back to the
/// caller untouched.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers (case-insensitive names)
    pub headers: HeaderMap,

    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response is an error (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Get a header value by name (case-insensitive).
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the response body as a string
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse response body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encoding`] if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> TransportResult<T> {
        serde_json::from_slice(&self.body).map_err(TransportError::from)
    }
}
