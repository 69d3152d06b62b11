//! Filesystem-based key-value store.
//!
//! Stores each key as `{base_path}/{key}.json`. Writes go through a temporary
//! file and a rename so a crashed write never leaves a truncated value.
//! There is no locking between processes; the last writer wins.

use super::KeyValueStore;
use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// Filesystem-backed key-value store.
#[derive(Debug, Clone)]
pub struct FilesystemKeyValueStore {
    base_path: PathBuf,
}

impl FilesystemKeyValueStore {
    /// Creates a store rooted at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let path = base_path.into();
        fs::create_dir_all(&path).map_err(|e| Error::operation("create_store_dir", e))?;
        Ok(Self { base_path: path })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{key}.{EXTENSION}")))
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid storage key: {key:?}")))
    }
}

impl KeyValueStore for FilesystemKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::operation("kv_read", format!("{}: {e}", path.display()))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, value).map_err(|e| Error::operation("kv_write", e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::operation("kv_rename", e))
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::operation("kv_remove", e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.base_path).map_err(|e| Error::operation("kv_list", e))?;
        let mut keys: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(ToString::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_and_missing_key() {
        let dir = TempDir::new().expect("tempdir");
        let store = FilesystemKeyValueStore::new(dir.path()).expect("store");

        assert_eq!(store.get("mycelial-projects").expect("get"), None);
        store.set("mycelial-projects", "[]").expect("set");
        assert_eq!(
            store.get("mycelial-projects").expect("get"),
            Some("[]".to_string())
        );
        assert!(dir.path().join("mycelial-projects.json").exists());
        assert!(!dir.path().join("mycelial-projects.json.tmp").exists());
    }

    #[test]
    fn test_keys_ignore_foreign_files() {
        let dir = TempDir::new().expect("tempdir");
        let store = FilesystemKeyValueStore::new(dir.path()).expect("store");
        store.set("b", "1").expect("set");
        store.set("a", "2").expect("set");
        fs::write(dir.path().join("notes.txt"), "x").expect("write foreign file");

        assert_eq!(store.keys().expect("keys"), vec!["a", "b"]);
        assert!(store.remove("a").expect("remove"));
        assert!(!store.remove("a").expect("remove again"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().expect("tempdir");
        let store = FilesystemKeyValueStore::new(dir.path()).expect("store");
        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(store.set(key, "x"), Err(Error::InvalidInput(_))));
        }
    }
}
