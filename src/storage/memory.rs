//! In-memory key-value store.
//!
//! Non-persistent; used for tests and `storage = "memory"`.

use super::KeyValueStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(operation: &str) -> Error {
    Error::operation(operation, "lock poisoned")
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| lock_error("kv_get"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| lock_error("kv_set"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| lock_error("kv_remove"))?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| lock_error("kv_keys"))?;
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("a").expect("get"), None);

        store.set("a", "1").expect("set");
        store.set("a", "2").expect("overwrite");
        assert_eq!(store.get("a").expect("get"), Some("2".to_string()));
        assert_eq!(store.len(), 1);

        assert!(store.remove("a").expect("remove"));
        assert!(!store.remove("a").expect("remove again"));
    }

    #[test]
    fn test_keys_sorted() {
        let store = MemoryKeyValueStore::new();
        store.set("b", "").expect("set");
        store.set("a", "").expect("set");
        assert_eq!(store.keys().expect("keys"), vec!["a", "b"]);
    }
}
