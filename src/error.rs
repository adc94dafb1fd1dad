//! Error types for the session layer
//!
//! One coherent hierarchy for everything the authenticated request path can
//! fail with, so callers match on kind instead of string-matching messages.
//! The token store and validator signal expected "not present / not valid"
//! cases with `Option`/`bool`; only the request and auth paths return these.

use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by the session layer
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials are stored but the operation requires one
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Credentials exist but could not be refreshed into a usable token
    #[error("Session expired")]
    SessionExpired,

    /// A token could not be decoded or lacked required claims
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Server rejected the input (HTTP 400) with field-level detail
    #[error("Validation failed: {detail}")]
    Validation {
        /// Human-readable summary from the server, when provided
        detail: String,
        /// Per-field error messages as parsed from the response body
        fields: HashMap<String, Vec<String>>,
    },

    /// Authenticated but not permitted (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource absent (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-2xx HTTP outcome, including a 2xx payload that could
    /// not be parsed as the expected shape
    #[error("Request failed with status {status}: {body}")]
    Request {
        /// HTTP status code returned by the server; 0 marks a client-side
        /// encode/decode failure that never produced an HTTP status
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Transport-level failure (unreachable host, timeout, aborted call),
    /// distinct from HTTP-status errors so callers can tell "server said
    /// no" apart from "could not reach server"
    #[error("Network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Classify a transport fault from `reqwest`
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Network(format!("request timed out: {}", err))
        } else {
            AuthError::Network(err.to_string())
        }
    }

    /// True for the kinds callers map to a redirect-to-login
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::SessionExpired
        )
    }
}
