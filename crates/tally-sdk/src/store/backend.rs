//! Key/value backings for the local store

use crate::error::{Result, TallyError};
use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// Synchronous string key/value persistence
///
/// The browser's `localStorage` is the model: one string per key, no
/// transactions, and possibly not there at all.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Whether anything written here can be read back
    fn is_available(&self) -> bool {
        true
    }
}

/// Process-lifetime backing, shared by clones
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: std::sync::Arc<DashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under a directory
///
/// The native-host counterpart of browser storage. Keys are sanitized into
/// file names, so distinct keys differing only in punctuation may collide.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Use `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write-then-rename so a crash never leaves half a blob behind
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path).map_err(|e| TallyError::Storage(format!("{}: {}", path.display(), e)))
    }
}

/// Backing for hosts without durable storage: always empty, writes vanish
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl KeyValueBackend for UnavailableBackend {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_backend_shared_between_clones() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").as_deref(), Some("v"));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_file_backend_persists() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path().join("store")).unwrap();
        backend.set("tally/local:v1", "[1,2]").unwrap();

        let reopened = FileBackend::new(temp.path().join("store")).unwrap();
        assert_eq!(reopened.get("tally/local:v1").as_deref(), Some("[1,2]"));
        assert!(reopened.get("missing").is_none());
    }

    #[test]
    fn test_unavailable_backend_forgets() {
        let backend = UnavailableBackend;
        backend.set("k", "v").unwrap();
        assert!(backend.get("k").is_none());
        assert!(!backend.is_available());
    }
}
