use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{info, warn};

use super::Authorizer;
use crate::error::AuthError;

type RefreshFn = dyn Fn() -> anyhow::Result<String> + Send + Sync;

/// Bearer-token authorizer that can obtain a new token on demand.
///
/// The refresh callback typically exchanges a refresh token at a token
/// endpoint. Refreshes are serialized: concurrent callers wait for the one in
/// flight and then run their own, so the callback never runs twice at once.
///
/// # Examples
///
/// ```rust
/// use rebound_core::auth::{Authorizer, RefreshingAuthorizer};
///
/// let authorizer = RefreshingAuthorizer::new("expired", || Ok("renewed".to_string()));
/// assert!(authorizer.attempt_credential_refresh());
/// assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer renewed"));
/// ```
pub struct RefreshingAuthorizer {
    token: RwLock<SecretString>,
    refresh_lock: Mutex<()>,
    refresh: Box<RefreshFn>,
}

impl RefreshingAuthorizer {
    /// Create an authorizer starting from `access_token`.
    pub fn new<F>(access_token: impl Into<String>, refresh: F) -> Self
    where
        F: Fn() -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            token: RwLock::new(secret(access_token.into())),
            refresh_lock: Mutex::new(()),
            refresh: Box::new(refresh),
        }
    }

    /// Run the refresh callback and install the new token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the callback fails or yields an empty token;
    /// the previous token stays in place.
    pub fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let token = (self.refresh)().map_err(AuthError::Refresh)?;
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = secret(token);
        Ok(())
    }
}

impl Authorizer for RefreshingAuthorizer {
    fn authorization_header(&self) -> Option<String> {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        Some(format!("Bearer {}", token.expose_secret()))
    }

    fn attempt_credential_refresh(&self) -> bool {
        match self.refresh() {
            Ok(()) => {
                info!("access token refreshed");
                true
            }
            Err(error) => {
                warn!(%error, "access token refresh failed");
                false
            }
        }
    }
}

impl fmt::Debug for RefreshingAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshingAuthorizer")
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

fn secret(token: String) -> SecretString {
    SecretString::new(token.into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_refresh_swaps_token() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let authorizer = RefreshingAuthorizer::new("old", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("new-{n}"))
        });

        assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer old"));
        assert!(authorizer.attempt_credential_refresh());
        assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer new-1"));
        assert!(authorizer.attempt_credential_refresh());
        assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer new-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_old_token() {
        let authorizer =
            RefreshingAuthorizer::new("old", || Err(anyhow::anyhow!("invalid_grant")));

        assert!(!authorizer.attempt_credential_refresh());
        assert!(matches!(authorizer.refresh(), Err(AuthError::Refresh(_))));
        assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer old"));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let authorizer = RefreshingAuthorizer::new("old", || Ok(String::new()));
        assert!(matches!(authorizer.refresh(), Err(AuthError::EmptyToken)));
        assert!(!authorizer.attempt_credential_refresh());
        assert_eq!(authorizer.authorization_header().as_deref(), Some("Bearer old"));
    }

    #[test]
    fn test_concurrent_refreshes_do_not_overlap() {
        let in_flight = Arc::new(AtomicU32::new(0));
        let overlaps = Arc::new(AtomicU32::new(0));
        let (flight, overlap) = (Arc::clone(&in_flight), Arc::clone(&overlaps));

        let authorizer = Arc::new(RefreshingAuthorizer::new("old", move || {
            if flight.fetch_add(1, Ordering::SeqCst) > 0 {
                overlap.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
            flight.fetch_sub(1, Ordering::SeqCst);
            Ok("fresh".to_string())
        }));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let authorizer = Arc::clone(&authorizer);
                std::thread::spawn(move || authorizer.attempt_credential_refresh())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
