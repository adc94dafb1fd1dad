//! Wire types for the auth endpoints
//!
//! Request/response bodies exchanged with the backend, plus parsing of the
//! field-error payloads the server attaches to 400 responses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::user::SessionUser;

/// Body of `POST /auth/token/`
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/token/`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
    /// Some backends return the user inline with the token pair
    #[serde(default)]
    pub user: Option<SessionUser>,
}

/// Body of `POST /auth/register/`
#[derive(Debug, Serialize)]
pub(crate) struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Response of `POST /auth/register/`
#[derive(Debug, Deserialize)]
pub(crate) struct SignupResponse {
    pub user: SessionUser,
}

/// Body of `POST /auth/token/refresh/`
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest {
    pub refresh: String,
}

/// Response of `POST /auth/token/refresh/`
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    /// Present only when the backend rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Pull the server's `detail` message out of an error body, when present
pub(crate) fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

/// Build an [`AuthError::Validation`] from a 400 response body
///
/// The server reports field errors as `{"field": ["msg", ...]}` (sometimes
/// a bare string per field) alongside an optional `detail` summary. An
/// unparseable body still produces a `Validation` error carrying the raw
/// text as its detail.
pub(crate) fn validation_error(body: &str) -> AuthError {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut detail = None;

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
        for (key, value) in map {
            if key == "detail" {
                detail = value.as_str().map(str::to_string);
                continue;
            }
            let messages = match value {
                serde_json::Value::String(msg) => vec![msg],
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => continue,
            };
            if !messages.is_empty() {
                fields.insert(key, messages);
            }
        }
    }

    AuthError::Validation {
        detail: detail.unwrap_or_else(|| {
            if fields.is_empty() {
                body.to_string()
            } else {
                "Validation failed".to_string()
            }
        }),
        fields,
    }
}
