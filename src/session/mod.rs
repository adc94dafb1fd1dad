//! Session manager
//!
//! The injectable owner of the client-side authentication lifecycle.
//! Consumers receive a [`SessionManager`] via dependency injection rather
//! than importing shared mutable globals; everything the rest of the
//! application needs (login, logout, the authenticated request wrapper,
//! and the auth event stream) hangs off this one object.

pub mod events;
pub mod refresh;

use std::sync::Arc;

use reqwest::header;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::api::backend::Backend;
use crate::api::types::{LoginRequest, SignupRequest, SignupResponse, TokenPairResponse};
use crate::api::{decode, into_json, ApiClient};
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::storage::{MemoryStorage, StorageBackend};
use crate::token::claims;
use crate::token::store::TokenStore;
use crate::user::SessionUser;

use events::AuthEvent;
use refresh::RefreshCoordinator;

/// Owns the full client-side authentication lifecycle
pub struct SessionManager {
    backend: Arc<Backend>,
    store: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    client: ApiClient,
}

impl SessionManager {
    /// Create a manager with in-memory session storage
    pub fn new(config: SessionConfig) -> Self {
        Self::with_storage(config, Box::new(MemoryStorage::new()))
    }

    /// Create a manager over a caller-provided storage backend
    pub fn with_storage(config: SessionConfig, storage: Box<dyn StorageBackend>) -> Self {
        let force_logout = config.force_logout_on_auth_failure;
        let backend = Arc::new(Backend::new(config));
        let store = Arc::new(TokenStore::new(storage));
        let refresher = Arc::new(RefreshCoordinator::new(backend.clone(), store.clone()));
        let client = ApiClient::new(
            backend.clone(),
            store.clone(),
            refresher.clone(),
            force_logout,
        );
        Self {
            backend,
            store,
            refresher,
            client,
        }
    }

    /// Sign in with email and password
    ///
    /// On success the returned token pair is stored (broadcasting a login
    /// event) and the user profile is cached when the backend includes one
    /// in the response; otherwise the profile is populated by the first
    /// [`fetch_current_user`](Self::fetch_current_user).
    ///
    /// # Errors
    /// [`AuthError::Validation`] for rejected input, [`AuthError::Request`]
    /// for rejected credentials, [`AuthError::Network`] for transport
    /// faults, [`AuthError::MalformedToken`] if the backend returns an
    /// undecodable access token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<SessionUser>, AuthError> {
        let body = self
            .post_public(
                "/auth/token/",
                &LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        let pair: TokenPairResponse = decode(body)?;

        self.store.set_credentials(&pair.access, &pair.refresh)?;
        if let Some(user) = &pair.user {
            self.store.set_user(user);
        }
        info!(email, "login succeeded");
        Ok(pair.user)
    }

    /// Register a new account
    ///
    /// Registration does not sign the user in; callers follow up with
    /// [`login`](Self::login).
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SessionUser, AuthError> {
        let body = self
            .post_public(
                "/auth/register/",
                &SignupRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                },
            )
            .await?;
        let response: SignupResponse = decode(body)?;
        info!(email, "signup succeeded");
        Ok(response.user)
    }

    /// Clear the stored session, broadcasting a logout
    ///
    /// Idempotent: logging out twice produces one logout event.
    pub fn logout(&self) {
        self.store.clear_credentials();
    }

    /// Exchange the refresh token for a new access token
    ///
    /// See [`RefreshCoordinator::refresh`] for the failure contract.
    pub async fn refresh(&self, force_logout_on_failure: bool) -> Option<String> {
        self.refresher.refresh(force_logout_on_failure).await
    }

    /// The cached user profile, without a round trip
    pub fn current_user(&self) -> Option<SessionUser> {
        self.store.get_user()
    }

    /// Fetch the signed-in user's profile and update the cache
    pub async fn fetch_current_user(&self) -> Result<SessionUser, AuthError> {
        let user: SessionUser = self.client.get("/v1/users/me/").await?;
        self.store.set_user(&user);
        Ok(user)
    }

    /// Whether a usable session is present
    ///
    /// True when credentials are stored and the refresh token is still
    /// usable under the day-scale safety margin; an expired access token
    /// alone does not end the session, since it can be refreshed.
    pub fn is_authenticated(&self) -> bool {
        match self.store.get_credentials() {
            Some(pair) => claims::is_valid(&pair.refresh, self.backend.config().refresh_buffer_secs),
            None => false,
        }
    }

    /// Subscribe to login/logout transitions
    ///
    /// The event is a signal to re-check, not the state itself: listeners
    /// re-query the store on receipt.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.store.subscribe()
    }

    /// The authenticated request wrapper for the rest of the application
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Direct access to the token store
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Unauthenticated POST to an auth endpoint
    async fn post_public<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, AuthError> {
        let url = self.backend.endpoint(path).await;
        debug!(url = %url, "dispatching public request");
        let response = self
            .backend
            .http()
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .timeout(self.backend.request_timeout())
            .send()
            .await
            .map_err(AuthError::from_transport)?;
        into_json(response).await
    }
}
