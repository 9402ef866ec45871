use std::fmt;

use super::state::RetryState;
use crate::auth::Authorizer;
use crate::error::TransportError;
use crate::response::HttpResponse;

/// Everything a checker may look at for one completed attempt.
///
/// A context is built by the executor after each physical send and dropped
/// once the verdict has been applied. Only the borrowed [`RetryState`]
/// outlives it.
///
/// Exactly one of [`error`](Self::error) and [`response`](Self::response) is
/// set for a real attempt. Contexts with neither are only useful in tests.
pub struct RetryContext<'a> {
    attempt: u32,
    error: Option<&'a TransportError>,
    response: Option<&'a HttpResponse>,
    authorizer: Option<&'a dyn Authorizer>,
    state: &'a mut RetryState,
}

impl<'a> RetryContext<'a> {
    /// Create a context for attempt number `attempt` (1-based).
    ///
    /// # Panics
    ///
    /// Panics if `attempt` is zero. Attempts are counted from the first send.
    pub fn new(attempt: u32, state: &'a mut RetryState) -> Self {
        assert!(attempt >= 1, "retry attempts are numbered from 1");
        Self {
            attempt,
            error: None,
            response: None,
            authorizer: None,
            state,
        }
    }

    /// Attach the response received by this attempt.
    ///
    /// # Panics
    ///
    /// Panics if an error was already attached.
    pub fn with_response(mut self, response: &'a HttpResponse) -> Self {
        assert!(
            self.error.is_none(),
            "an attempt cannot carry both an error and a response"
        );
        self.response = Some(response);
        self
    }

    /// Attach the transport error raised by this attempt.
    ///
    /// # Panics
    ///
    /// Panics if a response was already attached.
    pub fn with_error(mut self, error: &'a TransportError) -> Self {
        assert!(
            self.response.is_none(),
            "an attempt cannot carry both an error and a response"
        );
        self.error = Some(error);
        self
    }

    /// Attach the authorizer used for this attempt.
    pub fn with_authorizer(mut self, authorizer: &'a dyn Authorizer) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// The 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The transport error raised by this attempt, if any.
    pub fn error(&self) -> Option<&'a TransportError> {
        self.error
    }

    /// The response received by this attempt, if any.
    pub fn response(&self) -> Option<&'a HttpResponse> {
        self.response
    }

    /// The response status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.response.map(|r| r.status)
    }

    /// The authorizer in effect, if any.
    pub fn authorizer(&self) -> Option<&'a dyn Authorizer> {
        self.authorizer
    }

    /// Request-scoped state shared across attempts.
    pub fn state(&self) -> &RetryState {
        &*self.state
    }

    /// Mutable access to the request-scoped state.
    pub fn state_mut(&mut self) -> &mut RetryState {
        &mut *self.state
    }
}

impl fmt::Debug for RetryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryContext")
            .field("attempt", &self.attempt)
            .field("error", &self.error)
            .field("status", &self.status())
            .field("has_authorizer", &self.authorizer.is_some())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NullAuthorizer;
    use http::HeaderMap;

    #[test]
    fn test_accessors() {
        let mut state = RetryState::new();
        let response = HttpResponse::new(502, HeaderMap::new(), Vec::new());
        let authorizer = NullAuthorizer;

        let context = RetryContext::new(2, &mut state)
            .with_response(&response)
            .with_authorizer(&authorizer);

        assert_eq!(context.attempt(), 2);
        assert_eq!(context.status(), Some(502));
        assert!(context.error().is_none());
        assert!(context.authorizer().is_some());
    }

    #[test]
    fn test_state_writes_survive_the_context() {
        let mut state = RetryState::new();
        {
            let mut context = RetryContext::new(1, &mut state);
            context.state_mut().set_flag("seen");
        }
        assert!(state.flag("seen"));
    }

    #[test]
    #[should_panic(expected = "numbered from 1")]
    fn test_attempt_zero_is_rejected() {
        let mut state = RetryState::new();
        let _ = RetryContext::new(0, &mut state);
    }

    #[test]
    #[should_panic(expected = "both an error and a response")]
    fn test_error_and_response_are_exclusive() {
        let mut state = RetryState::new();
        let response = HttpResponse::new(500, HeaderMap::new(), Vec::new());
        let error = TransportError::Connection("reset".into());
        let _ = RetryContext::new(1, &mut state)
            .with_response(&response)
            .with_error(&error);
    }
}
