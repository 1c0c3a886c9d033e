//! Key-value store implementations.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError};

/// Suffix of the sibling file written before an atomic rename.
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Bytes a map occupies, counted as the sum of key and value lengths.
fn occupied_bytes(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(key, value)| key.len() + value.len()).sum()
}

fn check_quota(
    entries: &HashMap<String, String>,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
    let needed = occupied_bytes(entries) - replaced + key.len() + value.len();
    if needed > quota {
        return Err(StoreError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

/// Session-scoped store held in memory.
///
/// Used when no persistent store is available; contents vanish with the
/// process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// Drops every entry, as the host clearing storage would.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(&self.entries, key, value, self.quota)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a single JSON object file.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Opens (or prepares to create) the store file at `path`.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - Parent directory cannot be created
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opened file store at {}", path.display());
        Ok(Self { path, quota })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Unavailable {
                reason: format!("{} is not a valid store file: {e}", self.path.display()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist_entries(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(entries).map_err(|e| StoreError::Unavailable {
            reason: format!("failed to serialize store: {e}"),
        })?;

        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, serialized)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_entries()?.remove(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load_entries()?;
        check_quota(&entries, key, value, self.quota)?;
        entries.insert(key.to_string(), value.to_string());
        self.persist_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_write_then_read_returns_value() {
        let mut store = MemoryStore::new();
        assert_eq!(store.read("k").unwrap(), None);

        store.write("k", "v1").unwrap();
        store.write("k", "v2").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v2"));

        store.clear();
        assert_eq!(store.read("k").unwrap(), None);
    }

    #[test]
    fn test_memory_store_over_quota_write_rejected() {
        let mut store = MemoryStore::with_quota(10);
        store.write("k", "12345").unwrap();

        let result = store.write("other", "123456");
        assert!(matches!(
            result,
            Err(StoreError::QuotaExceeded {
                needed: 17,
                quota: 10
            })
        ));
        assert_eq!(store.read("other").unwrap(), None);
    }

    #[test]
    fn test_memory_store_replacing_value_frees_old_bytes() {
        let mut store = MemoryStore::with_quota(10);
        store.write("k", "123456789").unwrap();
        // Replacing the 9-byte value with another 9-byte value stays within quota.
        store.write("k", "987654321").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("987654321"));
    }

    #[test]
    fn test_file_store_values_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path, None).unwrap();
        assert_eq!(store.read("k").unwrap(), None);
        store.write("k", "value").unwrap();

        let reopened = FileStore::open(&path, None).unwrap();
        assert_eq!(reopened.read("k").unwrap().as_deref(), Some("value"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_over_quota_keeps_previous_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut store = FileStore::open(&path, Some(16)).unwrap();
        store.write("k", "small").unwrap();

        let result = store.write("k", "this value is far too large");
        assert!(matches!(result, Err(StoreError::QuotaExceeded { .. })));
        assert_eq!(store.read("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn test_file_store_corrupt_file_reported_unavailable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path, None).unwrap();
        assert!(matches!(
            store.read("k"),
            Err(StoreError::Unavailable { .. })
        ));
    }
}
