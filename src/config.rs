//! Session configuration
//!
//! Centralized configuration with environment variable support and
//! sensible defaults.

use std::env;

/// Configuration for a [`SessionManager`](crate::SessionManager)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Primary API base URL
    pub base_url: String,
    /// Alternate internal base URL used when the primary is unreachable
    pub fallback_base_url: Option<String>,
    /// Timeout for regular API requests (in seconds)
    pub request_timeout_secs: u64,
    /// Timeout for health/reachability probes (in seconds)
    pub health_timeout_secs: u64,
    /// Safety margin subtracted from an access token's expiry before it is
    /// treated as invalid (in seconds)
    pub token_buffer_secs: i64,
    /// Safety margin applied when checking whether a refresh token is still
    /// usable (in seconds); deliberately on the order of a day
    pub refresh_buffer_secs: i64,
    /// Whether auth failures in the request wrapper clear the stored
    /// session before the error surfaces to the caller
    pub force_logout_on_auth_failure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            fallback_base_url: None,
            request_timeout_secs: 15,
            health_timeout_secs: 3,
            token_buffer_secs: 60,
            refresh_buffer_secs: 86_400,
            force_logout_on_auth_failure: true,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("DASHBOARD_API_BASE_URL").unwrap_or(defaults.base_url),
            fallback_base_url: env::var("DASHBOARD_API_FALLBACK_URL").ok(),
            request_timeout_secs: env::var("DASHBOARD_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            health_timeout_secs: env::var("DASHBOARD_HEALTH_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.health_timeout_secs),
            token_buffer_secs: env::var("DASHBOARD_TOKEN_BUFFER_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.token_buffer_secs),
            refresh_buffer_secs: defaults.refresh_buffer_secs,
            force_logout_on_auth_failure: defaults.force_logout_on_auth_failure,
        }
    }

    /// Create a config pointing at the given base URL, defaults elsewhere
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
