#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core retry decision engine for the rebound HTTP client.
//!
//! This crate decides, for one completed request attempt, whether the request
//! should be sent again and how long to wait first. It never sends anything and
//! never sleeps; the executor in `rebound-transport` owns the loop.
//!
//! - **Checkers** via the [`RetryChecker`](retry::RetryChecker) trait
//!   - attempt budget, transport failures, `Retry-After`, transient 5xx,
//!     expired authorization
//! - **Policies** via [`RetryPolicy`](retry::RetryPolicy): an ordered,
//!   short-circuiting chain of checkers
//! - **Authorizers** via the [`Authorizer`](auth::Authorizer) capability
//! - **Backoff** via [`BackoffStrategy`](retry::BackoffStrategy) for executors
//!   that need a default delay
//!
//! # Examples
//!
//! ```rust
//! use rebound_core::prelude::*;
//! use http::HeaderMap;
//!
//! let policy = RetryPolicy::default();
//! let mut state = RetryState::new();
//! let response = HttpResponse::new(503, HeaderMap::new(), Vec::new());
//!
//! let mut context = RetryContext::new(1, &mut state).with_response(&response);
//! assert_eq!(policy.evaluate(&mut context), Verdict::Retry);
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use rebound_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{AccessTokenAuthorizer, Authorizer, NullAuthorizer, RefreshingAuthorizer};
    pub use crate::config::RetryConfig;
    pub use crate::error::{TransportError, TransportResult};
    pub use crate::response::HttpResponse;
    pub use crate::retry::{
        BackoffStrategy, ExpiredAuthorizationChecker, ExponentialBackoff, MaxAttemptsChecker,
        RetryAfterChecker, RetryChecker, RetryContext, RetryPolicy, RetryPolicyBuilder,
        RetryState, TransientServerErrorChecker, TransportErrorChecker, Verdict,
    };
}
