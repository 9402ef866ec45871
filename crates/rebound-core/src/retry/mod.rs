//! Retry decisions and backoff.
//!
//! A [`RetryPolicy`] runs an ordered chain of [`RetryChecker`]s against a
//! [`RetryContext`] describing one completed attempt. Each checker returns a
//! [`Verdict`]; the first one that is not [`Verdict::Indeterminate`] decides.
//!
//! # Key Types
//!
//! - [`RetryContext`] - One attempt: number, error or response, authorizer, state
//! - [`RetryState`] - Scratch storage shared by all attempts of a logical request
//! - [`RetryChecker`] - A single-responsibility rule
//! - [`RetryPolicy`] - The ordered, short-circuiting chain
//! - [`BackoffStrategy`] / [`ExponentialBackoff`] - Default delay between attempts
//!
//! # Examples
//!
//! ```rust
//! use rebound_core::retry::{RetryContext, RetryPolicy, RetryState, Verdict};
//! use rebound_core::response::HttpResponse;
//! use http::{HeaderMap, HeaderValue};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder().max_retries(3).build();
//! let mut state = RetryState::new();
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("retry-after", HeaderValue::from_static("2"));
//! let response = HttpResponse::new(429, headers, Vec::new());
//!
//! let mut context = RetryContext::new(1, &mut state).with_response(&response);
//! assert_eq!(policy.evaluate(&mut context), Verdict::RetryAfter(Duration::from_secs(2)));
//! ```

mod checker;
mod checkers;
mod context;
mod exponential;
mod policy;
mod state;
mod strategy;
mod verdict;

pub use checker::RetryChecker;
pub use checkers::{
    DEFAULT_RATE_LIMIT_STATUSES, DEFAULT_TRANSIENT_STATUSES, ExpiredAuthorizationChecker,
    MaxAttemptsChecker, RetryAfterChecker, TransientServerErrorChecker, TransportErrorChecker,
};
pub use context::RetryContext;
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use policy::{DEFAULT_MAX_RETRIES, RetryPolicy, RetryPolicyBuilder};
pub use state::{HAS_DONE_REAUTH, RetryState};
pub use strategy::BackoffStrategy;
pub use verdict::Verdict;
