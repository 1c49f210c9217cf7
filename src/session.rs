//! Credential and polling lifecycle.
//!
//! ```text
//! NoCredential -> AwaitingValidation -> Polling <-> Error
//!       ^                  |                          |
//!       +------------------+--------------------------+
//! ```

use crate::api::ApiError;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Prompting for a key, optionally explaining why.
    NoCredential { message: Option<String> },
    AwaitingValidation,
    Polling,
    /// The API rejected the stored key. Acknowledging returns to the prompt.
    Error { message: String },
}

/// Side effects the owner of the session must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Persist the validated key and start the poll timer.
    StartPolling,
    /// Stop the poll timer and forget the stored key.
    StopPollingAndClearCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
    /// Non-fatal failure of the last poll cycle, shown as a banner.
    inline_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::NoCredential { message: None },
            inline_error: None,
        }
    }
}

impl Session {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.state == SessionState::Polling
    }

    pub fn needs_credential(&self) -> bool {
        matches!(self.state, SessionState::NoCredential { .. })
    }

    /// A key is about to be checked against the API. Ignored unless the prompt is showing.
    pub fn begin_validation(&mut self) -> bool {
        if !self.needs_credential() {
            return false;
        }
        self.state = SessionState::AwaitingValidation;
        true
    }

    /// The key was rejected before any request went out.
    pub fn reject_locally(&mut self, reason: impl Into<String>) {
        self.state = SessionState::NoCredential {
            message: Some(reason.into()),
        };
    }

    pub fn validation_finished(&mut self, result: &Result<(), ApiError>) -> Effect {
        if self.state != SessionState::AwaitingValidation {
            return Effect::None;
        }

        match result {
            Ok(()) => {
                info!("API key validated");
                self.state = SessionState::Polling;
                self.inline_error = None;
                Effect::StartPolling
            }
            Err(e) => {
                warn!(error = %e, "API key validation failed");
                let message = if e.is_credential_failure() {
                    "Invalid API key. Please check and try again.".to_string()
                } else {
                    format!("Failed to validate API key: {e}")
                };
                self.state = SessionState::NoCredential {
                    message: Some(message),
                };
                Effect::None
            }
        }
    }

    /// A stored or configured key is trusted without a separate check; the first poll
    /// acts as validation.
    pub fn resume(&mut self) -> Effect {
        self.state = SessionState::Polling;
        self.inline_error = None;
        Effect::StartPolling
    }

    pub fn poll_finished<T>(&mut self, result: &Result<T, ApiError>) -> Effect {
        if self.state != SessionState::Polling {
            return Effect::None;
        }

        match result {
            Ok(_) => {
                self.inline_error = None;
                Effect::None
            }
            Err(e) if e.is_credential_failure() => {
                warn!(error = %e, "poll rejected, dropping credential");
                self.inline_error = None;
                self.state = SessionState::Error {
                    message: e.to_string(),
                };
                Effect::StopPollingAndClearCredential
            }
            Err(e) => {
                warn!(error = %e, "poll failed, will retry next cycle");
                self.inline_error = Some(format!("Failed to load devices: {e}"));
                Effect::None
            }
        }
    }

    /// Dismisses the credential error and shows the prompt with its message.
    pub fn acknowledge(&mut self) {
        if let SessionState::Error { message } = &self.state {
            self.state = SessionState::NoCredential {
                message: Some(message.clone()),
            };
        }
    }

    /// The user asked to enter a different key.
    pub fn clear_credential(&mut self) -> Effect {
        let was_polling = self.is_polling();
        self.state = SessionState::NoCredential { message: None };
        self.inline_error = None;
        if was_polling {
            Effect::StopPollingAndClearCredential
        } else {
            Effect::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn polling() -> Session {
        let mut session = Session::default();
        assert_eq!(session.resume(), Effect::StartPolling);
        session
    }

    #[test]
    fn starts_without_credential() {
        let session = Session::default();
        assert_eq!(session.state(), &SessionState::NoCredential { message: None });
        assert!(session.needs_credential());
    }

    #[test]
    fn successful_validation_starts_polling() {
        let mut session = Session::default();
        assert!(session.begin_validation());
        assert_eq!(session.state(), &SessionState::AwaitingValidation);

        assert_eq!(session.validation_finished(&Ok(())), Effect::StartPolling);
        assert!(session.is_polling());
    }

    #[test]
    fn failed_validation_returns_to_prompt_with_message() {
        let mut session = Session::default();
        session.begin_validation();

        let effect = session.validation_finished(&Err(ApiError::CredentialInvalid));
        assert_eq!(effect, Effect::None);
        assert_eq!(
            session.state(),
            &SessionState::NoCredential {
                message: Some("Invalid API key. Please check and try again.".into())
            }
        );
    }

    #[test]
    fn begin_validation_only_from_prompt() {
        let mut session = polling();
        assert!(!session.begin_validation());
        assert!(session.is_polling());
    }

    #[test]
    fn unauthorized_poll_enters_error_and_clears_credential() {
        let mut session = polling();
        let result: Result<(), ApiError> = Err(ApiError::CredentialInvalid);

        assert_eq!(
            session.poll_finished(&result),
            Effect::StopPollingAndClearCredential
        );
        assert!(matches!(session.state(), SessionState::Error { .. }));

        session.acknowledge();
        assert!(session.needs_credential());
        assert!(matches!(
            session.state(),
            SessionState::NoCredential { message: Some(_) }
        ));
    }

    #[test]
    fn other_poll_failures_stay_polling_with_banner() {
        let mut session = polling();
        let result: Result<(), ApiError> = Err(ApiError::TransientUpstream { status: 503 });

        assert_eq!(session.poll_finished(&result), Effect::None);
        assert!(session.is_polling());
        assert_eq!(
            session.inline_error(),
            Some("Failed to load devices: Upstream unavailable (HTTP 503)")
        );

        session.poll_finished(&Ok(()));
        assert_eq!(session.inline_error(), None);
    }

    #[test]
    fn late_poll_results_are_ignored_outside_polling() {
        let mut session = Session::default();
        let result: Result<(), ApiError> = Err(ApiError::CredentialInvalid);
        assert_eq!(session.poll_finished(&result), Effect::None);
        assert!(session.needs_credential());
    }

    #[test]
    fn clearing_while_polling_stops_the_poller() {
        let mut session = polling();
        assert_eq!(
            session.clear_credential(),
            Effect::StopPollingAndClearCredential
        );
        assert_eq!(session.state(), &SessionState::NoCredential { message: None });
    }
}
