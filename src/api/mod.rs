//! Authenticated request wrapper
//!
//! Performs HTTP requests with the current credentials, transparently
//! refreshing and retrying once when the server rejects an expired token.
//! This is the single place where HTTP and network faults are classified
//! into [`AuthError`], so every caller handles one coherent hierarchy.

pub(crate) mod backend;
pub(crate) mod types;

use std::sync::Arc;

use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::AuthError;
use crate::session::refresh::RefreshCoordinator;
use crate::token::claims;
use crate::token::store::TokenStore;

use backend::Backend;

/// HTTP client decorating requests with the session's credentials
///
/// Per call: check credentials, pre-validate the access token (refreshing
/// proactively inside the safety buffer), dispatch with a bearer header and
/// timeout, classify the response, and on 401 refresh and retry the
/// original request exactly once. Retries never loop.
pub struct ApiClient {
    backend: Arc<Backend>,
    store: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    force_logout: bool,
}

impl ApiClient {
    pub(crate) fn new(
        backend: Arc<Backend>,
        store: Arc<TokenStore>,
        refresher: Arc<RefreshCoordinator>,
        force_logout: bool,
    ) -> Self {
        Self {
            backend,
            store,
            refresher,
            force_logout,
        }
    }

    /// Authenticated GET returning a deserialized body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        decode(self.request(Method::GET, path, None).await?)
    }

    /// Authenticated POST with a JSON body, returning a deserialized body
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.request(Method::POST, path, Some(encode(body)?)).await?)
    }

    /// Authenticated PUT with a JSON body, returning a deserialized body
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.request(Method::PUT, path, Some(encode(body)?)).await?)
    }

    /// Authenticated DELETE; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), AuthError> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Authenticated request with a JSON body whose response body is ignored
    ///
    /// For endpoints that acknowledge with an empty or uninteresting body.
    pub async fn send_json<B>(&self, method: Method, path: &str, body: &B) -> Result<(), AuthError>
    where
        B: Serialize + ?Sized,
    {
        self.request(method, path, Some(encode(body)?)).await?;
        Ok(())
    }

    /// Perform an authenticated request, returning the raw JSON body
    ///
    /// # Errors
    /// * [`AuthError::NotAuthenticated`] if no credentials are stored
    /// * [`AuthError::SessionExpired`] if refresh failed or was exhausted
    /// * [`AuthError::Validation`] / [`AuthError::Forbidden`] /
    ///   [`AuthError::NotFound`] / [`AuthError::Request`] for HTTP outcomes
    /// * [`AuthError::Network`] for transport faults
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AuthError> {
        // Check: no credentials means no request at all
        let credentials = match self.store.get_credentials() {
            Some(credentials) => credentials,
            None => {
                if self.force_logout {
                    // drops any leftover cached state
                    self.store.clear_credentials();
                }
                return Err(AuthError::NotAuthenticated);
            }
        };

        // Pre-validate: never launch a request with a token that expires
        // mid-flight
        let mut access = credentials.access;
        if !claims::is_valid(&access, self.backend.config().token_buffer_secs) {
            debug!(path, "access token inside expiry buffer, refreshing before dispatch");
            access = match self.refresher.refresh(self.force_logout).await {
                Some(token) => token,
                None => return Err(self.session_expired()),
            };
        }

        let url = self.backend.endpoint(path).await;
        let response = self.dispatch(&method, &url, body.as_ref(), &access).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return into_json(response).await;
        }

        // 401: refresh once, retry the original request once, and take the
        // retried outcome as final
        debug!(path, "server rejected token, refreshing and retrying once");
        let access = match self.refresher.refresh(self.force_logout).await {
            Some(token) => token,
            None => return Err(self.session_expired()),
        };
        let retry = self.dispatch(&method, &url, body.as_ref(), &access).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            // a second 401 after a successful refresh means the session is
            // beyond saving
            return Err(self.session_expired());
        }
        into_json(retry).await
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        access: &str,
    ) -> Result<reqwest::Response, AuthError> {
        debug!(method = %method, url = %url, "dispatching authenticated request");
        let mut request = self
            .backend
            .http()
            .request(method.clone(), url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access))
            .header(header::ACCEPT, "application/json")
            .timeout(self.backend.request_timeout());
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(AuthError::from_transport)
    }

    fn session_expired(&self) -> AuthError {
        if self.force_logout {
            self.store.clear_credentials();
        }
        AuthError::SessionExpired
    }
}

/// Classify a non-2xx status with its body into the error taxonomy
///
/// 401 is not handled here: the request wrapper owns the refresh-and-retry
/// decision; everywhere else a 401 is just a [`AuthError::Request`].
pub(crate) fn classify_error(status: u16, body: String) -> AuthError {
    match status {
        400 => types::validation_error(&body),
        403 => AuthError::Forbidden(types::detail_message(&body).unwrap_or(body)),
        404 => AuthError::NotFound(types::detail_message(&body).unwrap_or(body)),
        _ => AuthError::Request { status, body },
    }
}

/// Read a response to completion and map it into the taxonomy
pub(crate) async fn into_json(response: reqwest::Response) -> Result<Value, AuthError> {
    let status = response.status();
    let body = response.text().await.map_err(AuthError::from_transport)?;

    if !status.is_success() {
        return Err(classify_error(status.as_u16(), body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| AuthError::Request {
        status: status.as_u16(),
        body: format!("unparseable response body: {}", e),
    })
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, AuthError> {
    serde_json::to_value(body).map_err(|e| AuthError::Request {
        status: 0,
        body: format!("could not encode request body: {}", e),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AuthError> {
    serde_json::from_value(value).map_err(|e| AuthError::Request {
        status: 0,
        body: format!("invalid response payload: {}", e),
    })
}
