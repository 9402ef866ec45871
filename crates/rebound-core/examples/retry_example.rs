//! Example: Walking a policy through a scripted series of attempt outcomes
//!
//! This example demonstrates:
//! 1. The default checker order and what each verdict means
//! 2. A refreshing authorizer recovering from one expired token
//! 3. A custom checker that refuses to retry a specific status
//!
//! Run with:
//! ```bash
//! cargo run -p rebound-core --example retry_example
//! ```

use http::{HeaderMap, HeaderValue};
use rebound_core::prelude::*;
use std::time::Duration;

fn response(status: u16, retry_after: Option<&'static str>) -> HttpResponse {
    let mut headers = HeaderMap::new();
    if let Some(value) = retry_after {
        headers.insert("Retry-After", HeaderValue::from_static(value));
    }
    HttpResponse::new(status, headers, Vec::new())
}

/// Never retry a 507; the storage quota will not free itself.
fn never_on_insufficient_storage(context: &mut RetryContext<'_>) -> Verdict {
    match context.status() {
        Some(507) => Verdict::DoNotRetry,
        _ => Verdict::Indeterminate,
    }
}

fn walk(
    title: &str,
    policy: &RetryPolicy,
    authorizer: Option<&dyn Authorizer>,
    outcomes: Vec<Result<HttpResponse, TransportError>>,
) {
    println!("\n{title}");
    let backoff = ExponentialBackoff::default();
    let mut state = RetryState::new();

    for (index, outcome) in outcomes.iter().enumerate() {
        let attempt = index as u32 + 1;
        let context = RetryContext::new(attempt, &mut state);
        let context = match outcome {
            Ok(response) => context.with_response(response),
            Err(error) => context.with_error(error),
        };
        let mut context = match authorizer {
            Some(authorizer) => context.with_authorizer(authorizer),
            None => context,
        };

        let verdict = policy.evaluate(&mut context);
        let described = match outcome {
            Ok(response) => format!("status {}", response.status),
            Err(error) => error.to_string(),
        };
        match verdict {
            Verdict::Retry => println!(
                "  Attempt {attempt} ({described}): retry in ~{:?}",
                backoff.next_delay(attempt)
            ),
            other => println!("  Attempt {attempt} ({described}): {other}"),
        }
        if !verdict.is_retry() {
            break;
        }
    }
}

fn main() {
    println!("=== Retry Policy Example ===");

    let policy = RetryPolicy::default();
    println!("Default checker order: {:?}", policy.checker_names());

    walk(
        "Example 1: transient failures then success",
        &policy,
        None,
        vec![
            Err(TransportError::Timeout(Duration::from_secs(30))),
            Ok(response(500, None)),
            Ok(response(429, Some("2"))),
            Ok(response(200, None)),
        ],
    );

    let authorizer = RefreshingAuthorizer::new("expired-token", || Ok("fresh-token".into()));
    walk(
        "Example 2: one credential refresh per logical request",
        &policy,
        Some(&authorizer),
        vec![Ok(response(401, None)), Ok(response(401, None))],
    );

    let custom = RetryPolicy::builder()
        .max_retries(2)
        .transient_statuses([500, 502, 503, 504, 507])
        .prepend_checker(never_on_insufficient_storage)
        .build();
    walk(
        "Example 3: a custom checker vetoes a configured transient status",
        &custom,
        None,
        vec![Ok(response(503, None)), Ok(response(507, None))],
    );

    walk(
        "Example 4: the attempt budget wins",
        &custom,
        None,
        vec![
            Ok(response(503, Some("1"))),
            Ok(response(503, Some("1"))),
            Ok(response(503, Some("1"))),
        ],
    );
}
