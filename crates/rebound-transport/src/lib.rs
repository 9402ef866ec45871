//! HTTP transport and retry executor for rebound
//!
//! Sends requests and drives the retry loop around the decision engine in
//! `rebound-core`. The engine decides; this crate sends, sleeps and gives up.
//!
//! # Architecture
//!
//! - **Transport trait**: one physical send, no retries
//! - **HTTP transport**: REST client via reqwest, mapping failures onto
//!   [`TransportError`] so checkers can tell network trouble from bad requests
//! - **Retry executor**: the attempt loop, with per-request state, default
//!   backoff, `Retry-After` waits and cancellation

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Usage
//!
//! ```ignore
//! use rebound_transport::{HttpRequest, HttpTransport, RetryExecutor};
//! use rebound_core::auth::AccessTokenAuthorizer;
//! use std::sync::Arc;
//!
//! let executor = RetryExecutor::new(HttpTransport::new()?);
//! let authorizer = Arc::new(AccessTokenAuthorizer::new("token"));
//! let request = HttpRequest::new("GET", "https://api.example.org/v1/items");
//! let response = executor.execute(request, Some(authorizer)).await?;
//! ```

pub mod error;
pub mod executor;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use executor::RetryExecutor;
pub use crate::http::{HttpTransport, HttpTransportConfig};
pub use rebound_core::response::HttpResponse;
pub use traits::{HttpRequest, Transport};
