//! Token store
//!
//! Single owner of the credential pair and cached user. No other component
//! reads raw token fields; all access goes through the accessors here.
//! Every mutation is observable exactly once on the auth event channel;
//! readers never emit.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::session::events::{AuthEvent, AuthEventKind};
use crate::storage::StorageBackend;
use crate::token::claims;
use crate::user::SessionUser;

const KEY_ACCESS: &str = "dashboard.access";
const KEY_REFRESH: &str = "dashboard.refresh";
const KEY_EXPIRES_AT: &str = "dashboard.expires_at";
const KEY_USER: &str = "dashboard.user";

/// Capacity of the auth event channel; lagging receivers miss old events
/// and re-query the store.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The stored access/refresh token pair with its derived expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    /// Short-lived token authorizing individual requests
    pub access: String,
    /// Long-lived token used solely to mint new access tokens
    pub refresh: String,
    /// Absolute expiry of the access token, milliseconds since epoch,
    /// recomputed from the token's own claim at store time
    pub expires_at: i64,
}

/// Session-scoped storage and retrieval of credentials and user profile
pub struct TokenStore {
    storage: Box<dyn StorageBackend>,
    events: broadcast::Sender<AuthEvent>,
}

impl TokenStore {
    /// Create a store over the given backend
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { storage, events }
    }

    /// Store a credential pair, deriving expiry from the access token
    ///
    /// The expiry is always recomputed from the token's own `exp` claim,
    /// never trusted from caller input, so the store's view of validity
    /// cannot desync from the token's real claim. Emits one `Login` event.
    ///
    /// # Errors
    /// Returns [`AuthError::MalformedToken`] if the access token cannot be
    /// decoded or carries no expiry claim; nothing is stored in that case.
    pub fn set_credentials(&self, access: &str, refresh: &str) -> Result<(), AuthError> {
        let expires_at = claims::expiry_millis(access)?;

        self.storage.set(KEY_ACCESS, access);
        self.storage.set(KEY_REFRESH, refresh);
        self.storage.set(KEY_EXPIRES_AT, &expires_at.to_string());

        info!(expires_at, "credentials stored");
        self.emit(AuthEventKind::Login);
        Ok(())
    }

    /// The stored pair, or `None`; never errors
    pub fn get_credentials(&self) -> Option<CredentialPair> {
        let access = self.storage.get(KEY_ACCESS)?;
        let refresh = self.storage.get(KEY_REFRESH)?;
        let expires_at = self
            .storage
            .get(KEY_EXPIRES_AT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Some(CredentialPair {
            access,
            refresh,
            expires_at,
        })
    }

    /// Remove all credential and user state
    ///
    /// Idempotent: clearing an empty store is a no-op and emits nothing;
    /// otherwise exactly one `Logout` event is emitted.
    pub fn clear_credentials(&self) {
        let had_credentials = self.storage.remove(KEY_ACCESS).is_some();
        self.storage.remove(KEY_REFRESH);
        self.storage.remove(KEY_EXPIRES_AT);
        self.storage.remove(KEY_USER);

        if had_credentials {
            info!("credentials cleared");
            self.emit(AuthEventKind::Logout);
        }
    }

    /// Cache the signed-in user's profile alongside the credentials
    pub fn set_user(&self, user: &SessionUser) {
        match serde_json::to_string(user) {
            Ok(json) => self.storage.set(KEY_USER, &json),
            Err(e) => warn!(error = %e, "failed to serialize user for cache"),
        }
    }

    /// The cached user profile, if any
    pub fn get_user(&self) -> Option<SessionUser> {
        let json = self.storage.get(KEY_USER)?;
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "cached user is unreadable, ignoring");
                None
            }
        }
    }

    /// Subscribe to login/logout transitions
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, kind: AuthEventKind) {
        // send only fails when there are no subscribers, which is fine
        let _ = self.events.send(AuthEvent::now(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::token::claims::test_support::{token_expiring_in, token_with_payload};
    use chrono::Utc;
    use tokio::sync::broadcast::error::TryRecvError;

    fn store() -> TokenStore {
        TokenStore::new(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn test_set_then_get_round_trips_pair() {
        let store = store();
        let access = token_expiring_in(300);

        store.set_credentials(&access, "refresh-token").unwrap();

        let pair = store.get_credentials().unwrap();
        assert_eq!(pair.access, access);
        assert_eq!(pair.refresh, "refresh-token");
    }

    #[test]
    fn test_set_credentials_derives_expiry_from_token() {
        let store = store();
        let access = token_expiring_in(300);

        store.set_credentials(&access, "r").unwrap();

        let pair = store.get_credentials().unwrap();
        let delta = pair.expires_at - Utc::now().timestamp_millis();
        // ~300s in the future, with slack for test execution time
        assert!(delta > 295_000 && delta <= 300_000, "delta was {}", delta);
    }

    #[test]
    fn test_set_credentials_rejects_token_without_exp() {
        let store = store();
        let access = token_with_payload(&serde_json::json!({ "sub": "u-1" }));

        let result = store.set_credentials(&access, "r");

        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
        assert!(store.get_credentials().is_none(), "nothing should be stored");
    }

    #[test]
    fn test_set_credentials_rejects_undecodable_token() {
        let store = store();
        assert!(matches!(
            store.set_credentials("garbage", "r"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_get_credentials_empty_store_returns_none() {
        assert!(store().get_credentials().is_none());
    }

    #[test]
    fn test_set_credentials_emits_one_login_event() {
        let store = store();
        let mut events = store.subscribe();

        store
            .set_credentials(&token_expiring_in(300), "r")
            .unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, AuthEventKind::Login);
        assert!(event.authenticated);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_clear_credentials_is_idempotent() {
        let store = store();
        store
            .set_credentials(&token_expiring_in(300), "r")
            .unwrap();
        let mut events = store.subscribe();

        store.clear_credentials();
        store.clear_credentials();

        assert!(store.get_credentials().is_none());
        // two clears in a row produce one logout event, not two
        let event = events.try_recv().unwrap();
        assert_eq!(event.kind, AuthEventKind::Logout);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_clear_on_empty_store_emits_nothing() {
        let store = store();
        let mut events = store.subscribe();

        store.clear_credentials();

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_readers_never_emit() {
        let store = store();
        store
            .set_credentials(&token_expiring_in(300), "r")
            .unwrap();
        let mut events = store.subscribe();

        store.get_credentials();
        store.get_user();

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_user_cache_round_trips_and_clears() {
        let store = store();
        store
            .set_credentials(&token_expiring_in(300), "r")
            .unwrap();
        let user = SessionUser {
            id: "u-1".to_string(),
            email: "a@b.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: None,
        };

        store.set_user(&user);
        assert_eq!(store.get_user(), Some(user));

        store.clear_credentials();
        assert!(store.get_user().is_none());
    }
}
