//! Refresh coordination
//!
//! Exchanges the refresh token for a new access token, proactively (before
//! a request would go out with a dying token) and reactively (after a 401).
//! Failure is never thrown; it is signaled by `None`, so call sites can
//! refresh opportunistically without exception ceremony.
//!
//! Concurrent callers share one in-flight exchange: simultaneous 401s from
//! parallel requests collapse into a single network call, and a backend
//! that rotates refresh tokens cannot lose an update to a racing exchange.

use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::backend::Backend;
use crate::api::types::{RefreshRequest, RefreshResponse};
use crate::token::store::{CredentialPair, TokenStore};

type InFlight = Shared<BoxFuture<'static, Option<String>>>;

/// Coordinates refresh-token exchanges against the backend
pub struct RefreshCoordinator {
    backend: Arc<Backend>,
    store: Arc<TokenStore>,
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(backend: Arc<Backend>, store: Arc<TokenStore>) -> Self {
        Self {
            backend,
            store,
            in_flight: Mutex::new(None),
        }
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Returns the new access token, or `None` when no refresh token is
    /// stored (no network call is made) or the exchange fails. With
    /// `force_logout_on_failure` a failed exchange also clears the token
    /// store, which broadcasts the logout.
    ///
    /// Callers arriving while an exchange is already in flight await that
    /// same exchange instead of starting their own.
    pub async fn refresh(&self, force_logout_on_failure: bool) -> Option<String> {
        let credentials = match self.store.get_credentials() {
            Some(credentials) if !credentials.refresh.is_empty() => credentials,
            _ => {
                debug!("no refresh token stored, skipping exchange");
                return None;
            }
        };

        let exchange = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(shared) => shared.clone(),
                None => {
                    let shared =
                        run_exchange(self.backend.clone(), self.store.clone(), credentials)
                            .boxed()
                            .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        let result = exchange.clone().await;

        // whichever caller finishes first retires the flight; the ptr check
        // keeps a slow finisher from evicting a newer exchange
        {
            let mut slot = self.in_flight.lock().await;
            if slot.as_ref().is_some_and(|shared| shared.ptr_eq(&exchange)) {
                *slot = None;
            }
        }

        if result.is_none() && force_logout_on_failure {
            warn!("refresh failed, clearing session");
            self.store.clear_credentials();
        }
        result
    }
}

/// The actual exchange; shared by every caller that joined the flight
async fn run_exchange(
    backend: Arc<Backend>,
    store: Arc<TokenStore>,
    credentials: CredentialPair,
) -> Option<String> {
    let url = backend.endpoint("/auth/token/refresh/").await;
    debug!(url = %url, "exchanging refresh token");

    let response = backend
        .http()
        .post(&url)
        .json(&RefreshRequest {
            refresh: credentials.refresh.clone(),
        })
        .timeout(backend.request_timeout())
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "refresh exchange failed to reach the server");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "refresh exchange rejected");
        return None;
    }

    let body: RefreshResponse = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "refresh response was not the expected shape");
            return None;
        }
    };

    // the backend may rotate the refresh token; absent rotation the
    // existing one is carried over unchanged
    let refresh = body.refresh.unwrap_or(credentials.refresh);
    match store.set_credentials(&body.access, &refresh) {
        Ok(()) => {
            info!("access token refreshed");
            Some(body.access)
        }
        Err(e) => {
            warn!(error = %e, "refresh returned an unusable access token");
            None
        }
    }
}
