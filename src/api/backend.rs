//! Backend selection and shared HTTP plumbing
//!
//! Deployments expose the API on a primary URL and, in some topologies, an
//! alternate internal URL. The health probe exists only to pick a reachable
//! base; the choice is made once per manager and cached.

use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::SessionConfig;

/// Shared HTTP client, configuration, and the resolved base URL
pub(crate) struct Backend {
    http: reqwest::Client,
    config: SessionConfig,
    resolved_base: OnceCell<String>,
}

impl Backend {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            // one shared client per manager for connection pooling
            http: reqwest::Client::new(),
            config,
            resolved_base: OnceCell::new(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Absolute URL for an API path on the resolved base
    pub(crate) async fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url().await, path)
    }

    /// The base URL requests should target
    ///
    /// With no fallback configured this is simply the configured base.
    /// Otherwise the primary is probed once; if unreachable, the fallback
    /// takes its place for the lifetime of this manager.
    pub(crate) async fn base_url(&self) -> String {
        if let Some(base) = self.resolved_base.get() {
            return base.clone();
        }
        let base = self.select_base().await;
        // a concurrent caller may have resolved first; either probe result
        // points at the same deployment
        let _ = self.resolved_base.set(base.clone());
        base
    }

    async fn select_base(&self) -> String {
        let primary = self.config.base_url.trim_end_matches('/').to_string();
        let fallback = match &self.config.fallback_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => return primary,
        };

        if self.probe(&primary).await {
            debug!(base = %primary, "primary base reachable");
            primary
        } else {
            warn!(base = %primary, fallback = %fallback, "primary base unreachable, using fallback");
            fallback
        }
    }

    /// Reachability probe; any HTTP response counts as reachable
    async fn probe(&self, base: &str) -> bool {
        let url = format!("{}/health/", base);
        self.http
            .get(&url)
            .timeout(Duration::from_secs(self.config.health_timeout_secs))
            .send()
            .await
            .is_ok()
    }
}
