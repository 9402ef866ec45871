//! Authorizers: the credential capability handed to the retry engine.
//!
//! An [`Authorizer`] supplies the `Authorization` header for every attempt and
//! may be asked, at most once per logical request, to replace credentials the
//! server rejected with a 401.

mod access_token;
mod refreshing;

pub use access_token::AccessTokenAuthorizer;
pub use refreshing::RefreshingAuthorizer;

/// Supplies and optionally refreshes request credentials.
///
/// Implementations are shared between concurrent logical requests. When
/// several of them ask for a refresh at the same time, the authorizer is
/// responsible for serializing or deduplicating the work.
pub trait Authorizer: Send + Sync {
    /// Value for the `Authorization` header, or `None` to send none.
    fn authorization_header(&self) -> Option<String>;

    /// Try to obtain fresh credentials after the server rejected the current ones.
    ///
    /// Returns `true` only if new credentials are in place. May block while a
    /// token endpoint is contacted. The default implementation cannot refresh.
    fn attempt_credential_refresh(&self) -> bool {
        false
    }
}

/// Sends no credentials and never refreshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuthorizer;

impl Authorizer for NullAuthorizer {
    fn authorization_header(&self) -> Option<String> {
        None
    }
}

impl<A: Authorizer + ?Sized> Authorizer for std::sync::Arc<A> {
    fn authorization_header(&self) -> Option<String> {
        (**self).authorization_header()
    }

    fn attempt_credential_refresh(&self) -> bool {
        (**self).attempt_credential_refresh()
    }
}
