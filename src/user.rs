//! Session user model
//!
//! The minimal profile cached alongside the credential pair so the UI can
//! show who is signed in without a round trip.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Minimal profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Unique identifier assigned by the backend
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    /// Email address used to sign in
    pub email: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Role within the organization, when the backend provides one
    #[serde(default)]
    pub role: Option<String>,
}

impl SessionUser {
    /// Name suitable for display, falling back to the email address
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Accept the backend's identifier whether it arrives as a JSON string or
/// number
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Same as [`flexible_id`], for optional claims
pub(crate) fn flexible_id_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_snake_case_fields() {
        let json = r#"{
            "id": 42,
            "email": "a@b.com",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "role": "admin"
        }"#;
        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_deserialize_string_id() {
        let json = r#"{"id": "u-1", "email": "a@b.com"}"#;
        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.first_name, "");
        assert!(user.role.is_none());
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let user = SessionUser {
            id: "1".to_string(),
            email: "a@b.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: None,
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = SessionUser {
            id: "1".to_string(),
            email: "a@b.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: None,
        };
        assert_eq!(user.display_name(), "a@b.com");
    }
}
