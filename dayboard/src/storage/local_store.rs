//! Synchronous key-value store for client-local state
//!
//! Holds cached server snapshots, serialized staged patches and small
//! preference flags. Two backends are provided: an in-memory map and a
//! directory of JSON files (one file per key).
//!
//! Callers that must never fail use [`read_json`] / [`write_json`], which log
//! and swallow store errors so a broken store only costs durability.

use crate::error::{AppError, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Synchronous string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for a key, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the raw value for a key, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store, lost when the process exits
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed store: each key lives in `<root>/<encoded key>.json`
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a file store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        tracing::info!("Local store initialized at: {:?}", self.root);
        Ok(())
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.get_path(key);

        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.get_path(key);

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(temp_path, &path)?;

        tracing::debug!("Wrote local key {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.get_path(key);

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path)?;
        Ok(())
    }
}

/// Map a key onto a portable file name.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte is
/// written as `%XX`, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Read and decode a JSON value, treating any failure as a miss
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Local store read failed for {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Discarding unreadable local value {}: {}", key, e);
            None
        }
    }
}

/// Encode and write a JSON value; returns whether the write landed
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(AppError::from)
        .and_then(|raw| store.set(key, &raw));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Local store write failed for {}: {}", key, e);
            false
        }
    }
}

/// Remove a key, logging instead of failing
pub fn remove_key(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!("Local store remove failed for {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("local"));
        store.initialize().unwrap();
        (store, temp_dir)
    }

    /// Store whose every operation fails, standing in for disabled storage
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(AppError::Storage("unavailable".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::Storage("unavailable".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(AppError::Storage("unavailable".to_string()))
        }
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let (store, _temp) = create_test_store();

        assert_eq!(store.get("cache:todos").unwrap(), None);

        store.set("cache:todos", "[1,2]").unwrap();
        assert_eq!(store.get("cache:todos").unwrap().as_deref(), Some("[1,2]"));

        store.set("cache:todos", "[3]").unwrap();
        assert_eq!(store.get("cache:todos").unwrap().as_deref(), Some("[3]"));

        store.remove("cache:todos").unwrap();
        assert_eq!(store.get("cache:todos").unwrap(), None);

        // Removing twice is fine
        store.remove("cache:todos").unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let (store, temp) = create_test_store();
        store.set("staged:ideas", "{}").unwrap();

        let reopened = FileStore::new(temp.path().join("local"));
        assert_eq!(reopened.get("staged:ideas").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_encode_key_is_portable_and_distinct() {
        assert_eq!(encode_key("cache:todos"), "cache%3Atodos");
        assert_ne!(encode_key("a:b"), encode_key("a_b"));
        assert_ne!(encode_key("a/b"), encode_key("a%2Fb"));
    }

    #[test]
    fn test_json_helpers_round_trip_through_memory() {
        let store = MemoryStore::new();

        assert!(write_json(&store, "pref:compact", &true));
        assert_eq!(read_json::<bool>(&store, "pref:compact"), Some(true));

        remove_key(&store, "pref:compact");
        assert_eq!(read_json::<bool>(&store, "pref:compact"), None);
    }

    #[test]
    fn test_json_helpers_swallow_failures() {
        let store = BrokenStore;

        assert!(!write_json(&store, "pref:compact", &true));
        assert_eq!(read_json::<bool>(&store, "pref:compact"), None);
        remove_key(&store, "pref:compact");
    }

    #[test]
    fn test_corrupt_value_reads_as_miss() {
        let store = MemoryStore::new();
        store.set("cache:todos", "{not json").unwrap();

        assert_eq!(read_json::<Vec<u32>>(&store, "cache:todos"), None);
    }
}
