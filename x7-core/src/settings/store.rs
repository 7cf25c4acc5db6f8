//! Local key/value store the settings synchronizer reads and writes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The application's configuration store, as seen by the session.
///
/// Implementations use interior mutability; the session shares one
/// store with the application for the lifetime of a connect.
pub trait SettingsStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str);
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool);

    /// Set by the application after the user edited settings offline.
    /// The next connect pushes local values to the camera instead of pulling.
    fn pending_update(&self) -> bool;
    fn set_pending_update(&self, pending: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Flag(bool),
}

impl std::fmt::Display for StoredValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, StoredValue>>,
    pending_update: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, StoredValue)>,
        K: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.values();
            for (key, value) in values {
                map.insert(key.into(), value);
            }
        }
        store
    }

    /// Copy of every stored value, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.values().clone()
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, StoredValue>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore for MemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.values().get(key)? {
            StoredValue::Text(s) => Some(s.clone()),
            StoredValue::Flag(_) => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) {
        self.values()
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values().get(key)? {
            StoredValue::Flag(b) => Some(*b),
            StoredValue::Text(_) => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.values().insert(key.to_string(), StoredValue::Flag(value));
    }

    fn pending_update(&self) -> bool {
        self.pending_update.load(Ordering::SeqCst)
    }

    fn set_pending_update(&self, pending: bool) {
        self.pending_update.store(pending, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_values() {
        let store = MemoryStore::new();
        store.set_string("video_mode", "2");
        store.set_bool("system_led", true);

        assert_eq!(store.get_string("video_mode").as_deref(), Some("2"));
        assert_eq!(store.get_bool("system_led"), Some(true));
        assert_eq!(store.get_bool("video_mode"), None);
        assert_eq!(store.get_string("missing"), None);
    }

    #[test]
    fn pending_flag() {
        let store = MemoryStore::new();
        assert!(!store.pending_update());
        store.set_pending_update(true);
        assert!(store.pending_update());
    }

    #[test]
    fn seeded_snapshot() {
        let store = MemoryStore::with_values([
            ("b", StoredValue::Flag(false)),
            ("a", StoredValue::Text("x".into())),
        ]);
        let keys: Vec<_> = store.snapshot().into_keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
