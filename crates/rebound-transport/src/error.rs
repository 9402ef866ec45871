//! Transport error types

use std::time::Duration;

pub use rebound_core::error::TransportError;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Map a reqwest failure onto the engine's error taxonomy.
///
/// Timeouts and connection failures come out as network errors and will be
/// retried; problems building the request never will.
pub fn classify_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() || err.is_request() {
        TransportError::Connection(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::Encoding(err.to_string())
    } else {
        TransportError::Http(err.to_string())
    }
}
