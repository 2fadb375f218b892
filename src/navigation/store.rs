/// Persisted search-result store
///
/// Search results are written by the query feature and read once per page
/// load by the navigation builder. Values are serialized result lists keyed
/// by a caller-supplied query key.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Result;

/// Read port over the persisted key-value store
pub trait PersistedStore: Send + Sync {
    /// Raw serialized value for `key`, `None` when absent or unreadable
    fn get(&self, key: &str) -> Option<String>;
}

/// Store that the search feature can also write to
pub trait WritableStore: PersistedStore {
    fn set(&self, key: &str, value: String) -> Result<()>;
}

/// In-memory store, scoped to the owning process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.write() {
            entries.insert(key.into(), value.into());
        }
        store
    }
}

impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

impl WritableStore for MemoryStore {
    fn set(&self, key: &str, value: String) -> Result<()> {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value);
            }
            // A writer panicked mid-insert; the map itself is still usable
            Err(poisoned) => {
                poisoned.into_inner().insert(key.to_string(), value);
            }
        }
        Ok(())
    }
}

/// Directory-backed store holding one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("📁 Session store directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a key: a readable prefix plus the md5 of the full key
    fn file_name(key: &str) -> String {
        let readable: String = key
            .chars()
            .take(30)
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        format!("{}_{:x}.json", readable, md5::compute(key.as_bytes()))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(Self::file_name(key))
    }

    /// Remove the value stored under `key`
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
            info!("🗑️ Removed stored results for key: {}", key);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl PersistedStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store miss for key {}", key);
                None
            }
            Err(e) => {
                warn!("Failed to read store file {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl WritableStore for FileStore {
    fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)?;
        debug!("💾 Stored results for key {} at {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing"), None);

        store.set("q1", "[]".to_string()).unwrap();
        assert_eq!(store.get("q1").as_deref(), Some("[]"));

        let store = MemoryStore::with_entry("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("session")).unwrap();

        assert_eq!(store.get("maple syrup"), None);

        store.set("maple syrup", "[{\"video_id\":\"a\"}]".to_string()).unwrap();
        assert_eq!(store.get("maple syrup").as_deref(), Some("[{\"video_id\":\"a\"}]"));

        assert!(store.remove("maple syrup").unwrap());
        assert!(!store.remove("maple syrup").unwrap());
        assert_eq!(store.get("maple syrup"), None);
    }

    #[test]
    fn test_file_names_are_sanitized_and_distinct() {
        let a = FileStore::file_name("../../etc/passwd");
        assert!(!a.contains('/'));
        assert!(a.ends_with(".json"));

        assert_ne!(FileStore::file_name("a b"), FileStore::file_name("a_b"));
    }

    #[test]
    fn test_file_names_are_stable_across_builds() {
        // values written by an older binary must still be found
        assert_eq!(FileStore::file_name("abc"), "abc_900150983cd24fb0d6963f7d28e17f72.json");
        assert_eq!(FileStore::file_name(""), "_d41d8cd98f00b204e9800998ecf8427e.json");
    }
}
