use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;

use super::Authorizer;

/// Sends a fixed bearer token. Cannot handle 401s.
#[derive(Clone)]
pub struct AccessTokenAuthorizer {
    access_token: SecretString,
}

impl AccessTokenAuthorizer {
    /// Create an authorizer for a single access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        debug!("setting up AccessTokenAuthorizer; 401s will not trigger a refresh");
        Self {
            access_token: SecretString::new(access_token.into().into_boxed_str()),
        }
    }
}

impl Authorizer for AccessTokenAuthorizer {
    fn authorization_header(&self) -> Option<String> {
        Some(format!("Bearer {}", self.access_token.expose_secret()))
    }
}

impl fmt::Debug for AccessTokenAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenAuthorizer")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
