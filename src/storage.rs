//! Session-scoped key/value storage
//!
//! The credential pair and cached user live in a small string store keyed
//! by fixed identifiers, the same shape as the browser session storage the
//! dashboard uses. The backend is pluggable so embedders and tests can
//! substitute their own; nothing here ever writes durable storage.

use std::collections::HashMap;
use std::sync::RwLock;

/// A string key/value store scoped to the current session
///
/// Implementations must be cheap and infallible: `get` returns `None` for
/// absent keys, `remove` reports whether a value was present so callers can
/// keep mutation side effects (event emission) exactly-once.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove `key`, returning the previous value if one was stored
    fn remove(&self, key: &str) -> Option<String>;
}

/// In-memory [`StorageBackend`], the default
///
/// Lives exactly as long as the owning session manager, which matches the
/// session-scoped lifetime of the browser store it stands in for.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("storage lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .expect("storage lock poisoned")
            .remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_absent_key_returns_none() {
        let storage = MemoryStorage::new();
        assert!(storage.get("missing").is_none());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let storage = MemoryStorage::new();
        storage.set("k", "v");
        assert_eq!(storage.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let storage = MemoryStorage::new();
        storage.set("k", "old");
        storage.set("k", "new");
        assert_eq!(storage.get("k").as_deref(), Some("new"));
    }

    #[test]
    fn test_remove_reports_presence() {
        let storage = MemoryStorage::new();
        storage.set("k", "v");
        assert_eq!(storage.remove("k").as_deref(), Some("v"));
        assert!(storage.remove("k").is_none());
        assert!(storage.get("k").is_none());
    }
}
