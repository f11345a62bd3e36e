//! Durable key-value storage backing the record store.
//!
//! The record store serializes each collection into one value under the
//! key `"{user_id}/{collection}"`. [`KeyValueStorage`] is the seam between
//! that layout and the medium: [`MemoryStorage`] for tests and ephemeral
//! sessions, [`FileStorage`] for on-device persistence.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::LedgerError;

/// Minimal durable string store.
///
/// A successful [`KeyValueStorage::write`] must be durable before it
/// returns: the record store publishes change notifications right after.
pub trait KeyValueStorage: Send + Sync + fmt::Debug {
    /// Reads the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the medium cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), LedgerError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), LedgerError>;
}

/// In-process storage. Survives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a root directory.
///
/// Key segments separated by `/` become nested directories; characters
/// outside `[A-Za-z0-9_-]` are hex-escaped so user ids cannot traverse out
/// of the root. Writes go to a temporary sibling and are renamed into
/// place, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) storage rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            LedgerError::Storage(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            let escaped = escape_segment(segment);
            if segments.peek().is_some() {
                path.push(escaped);
            } else {
                path.push(format!("{escaped}.json"));
            }
        }
        path
    }
}

impl KeyValueStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::Storage(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| LedgerError::Storage(format!("cannot write {}: {e}", path.display())))
    }

    fn remove(&self, key: &str) -> Result<(), LedgerError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Storage(format!(
                "cannot remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            escaped.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    if escaped.is_empty() {
        escaped.push('%');
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip_and_remove() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.read("u1/groups"), Ok(None)));

        assert!(storage.write("u1/groups", "[]").is_ok());
        assert!(matches!(storage.read("u1/groups"), Ok(Some(ref v)) if v == "[]"));
        assert_eq!(storage.len(), 1);

        assert!(storage.remove("u1/groups").is_ok());
        assert!(storage.is_empty());
        assert!(storage.remove("u1/groups").is_ok());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(first) = FileStorage::open(dir.path()) else {
            panic!("open");
        };
        assert!(first.write("alice@example.com/expenses", "[1]").is_ok());

        let Ok(second) = FileStorage::open(dir.path()) else {
            panic!("reopen");
        };
        let Ok(Some(value)) = second.read("alice@example.com/expenses") else {
            panic!("value should survive reopen");
        };
        assert_eq!(value, "[1]");
    }

    #[test]
    fn file_storage_missing_key_is_none() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(storage) = FileStorage::open(dir.path()) else {
            panic!("open");
        };
        assert!(matches!(storage.read("nobody/groups"), Ok(None)));
        assert!(storage.remove("nobody/groups").is_ok());
    }

    #[test]
    fn segments_cannot_escape_root() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(storage) = FileStorage::open(dir.path()) else {
            panic!("open");
        };
        let path = storage.path_for("../../etc/groups");
        assert!(path.starts_with(dir.path()));
        assert_eq!(escape_segment(".."), "%2E%2E");
    }
}
