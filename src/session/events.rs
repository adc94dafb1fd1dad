//! Auth transition events
//!
//! Login/logout signals for independently-mounted parts of the application.
//! The payload is a signal to re-check, not the state itself: listeners
//! re-query the token store rather than trusting the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of authentication transition that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    /// Credentials were stored
    Login,
    /// Credentials were cleared
    Logout,
}

/// A single authentication transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Which transition occurred
    pub kind: AuthEventKind,
    /// Whether the session is authenticated after the transition
    pub authenticated: bool,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

impl AuthEvent {
    pub(crate) fn now(kind: AuthEventKind) -> Self {
        Self {
            kind,
            authenticated: kind == AuthEventKind::Login,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_event_is_authenticated() {
        let event = AuthEvent::now(AuthEventKind::Login);
        assert!(event.authenticated);
        assert_eq!(event.kind, AuthEventKind::Login);
    }

    #[test]
    fn test_logout_event_is_not_authenticated() {
        let event = AuthEvent::now(AuthEventKind::Logout);
        assert!(!event.authenticated);
    }

    #[test]
    fn test_event_serializes_kind_as_snake_case() {
        let event = AuthEvent::now(AuthEventKind::Logout);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "logout");
    }
}
