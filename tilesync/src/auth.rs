//! Bearer token storage.
//!
//! The token is obtained out of band and only stored here; every remote call
//! reads it fresh, and the last write wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::store::StoreError;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "jwt";

/// Storage for the bearer token attached to service calls.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    /// Replace the stored token; `None` clears it.
    fn set(&self, token: Option<String>) -> Result<(), StoreError>;
}

/// Token held only in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: Option<String>) -> Result<(), StoreError> {
        *self.token.write() = token;
        Ok(())
    }
}

/// Token persisted in a small JSON key/value file.
///
/// The file is rewritten through a temporary sibling and a rename, so a crash
/// never leaves a half-written token behind. Every read goes back to the file,
/// so a token stored by another process wins from the next call on.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open the token file at `path`. A missing file means no token.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let token = read_entries(&path)?.remove(TOKEN_KEY);
        Ok(Self {
            path,
            cached: RwLock::new(token),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl TokenStore for FileTokenStore {
    /// Re-reads the file so writes from other processes are picked up. Falls
    /// back to the last token seen if the file cannot be read.
    fn get(&self) -> Option<String> {
        match read_entries(&self.path) {
            Ok(mut entries) => {
                let token = entries.remove(TOKEN_KEY);
                *self.cached.write() = token.clone();
                token
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                self.cached.read().clone()
            }
        }
    }

    fn set(&self, token: Option<String>) -> Result<(), StoreError> {
        let mut cached = self.cached.write();

        let mut entries = read_entries(&self.path)?;
        match &token {
            Some(value) => entries.insert(TOKEN_KEY.to_string(), value.clone()),
            None => entries.remove(TOKEN_KEY),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path = %self.path.display(), present = token.is_some(), "Token updated");
        *cached = token;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_last_write_wins() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());
        store.set(Some("a".into())).unwrap();
        store.set(Some("b".into())).unwrap();
        assert_eq!(store.get().as_deref(), Some("b"));
        store.set(None).unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileTokenStore::open(temp.path().join("auth.json")).unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_file_store_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/auth.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(Some("token-1".into())).unwrap();
        assert_eq!(store.get().as_deref(), Some("token-1"));
        assert!(!path.with_extension("tmp").exists());

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get().as_deref(), Some("token-1"));

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get(TOKEN_KEY).map(String::as_str), Some("token-1"));
    }

    #[test]
    fn test_file_store_clear_keeps_other_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("auth.json");
        fs::write(&path, r#"{"jwt":"x","other":"y"}"#).unwrap();

        let store = FileTokenStore::open(&path).unwrap();
        assert_eq!(store.get().as_deref(), Some("x"));
        store.set(None).unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!raw.contains_key(TOKEN_KEY));
        assert_eq!(raw.get("other").map(String::as_str), Some("y"));
    }

    #[test]
    fn test_file_store_sees_writes_from_another_store() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("auth.json");

        let daemon = FileTokenStore::open(&path).unwrap();
        daemon.set(Some("old".into())).unwrap();

        let cli = FileTokenStore::open(&path).unwrap();
        cli.set(Some("new".into())).unwrap();
        assert_eq!(daemon.get().as_deref(), Some("new"));

        cli.set(None).unwrap();
        assert!(daemon.get().is_none());
    }
}
