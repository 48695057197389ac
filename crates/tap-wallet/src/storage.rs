//! Durable key-value storage for the persisted session.
//!
//! The session is stored as one JSON blob under a fixed namespace key.
//! [`FileStore`] keeps one `<key>.json` file per namespace; [`MemoryStore`]
//! is used when nothing should outlive the process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::WalletError;
use crate::session::PersistedSession;

/// A namespaced string store (the browser's `localStorage` contract).
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, WalletError>;

    fn set(&self, key: &str, value: &str) -> Result<(), WalletError>;

    fn remove(&self, key: &str) -> Result<(), WalletError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, WalletError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WalletError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), WalletError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed store rooted at a directory.
///
/// Writes go to a temporary sibling and are renamed into place, so a crash
/// mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, WalletError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(WalletError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, WalletError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WalletError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), WalletError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load the persisted session under `key`.
///
/// A blob that no longer parses is removed and treated as absent.
pub fn load_snapshot(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<PersistedSession>, WalletError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(snapshot) => {
            debug!(key, "loaded persisted session");
            Ok(Some(snapshot))
        }
        Err(e) => {
            warn!(key, "discarding corrupt persisted session: {e}");
            store.remove(key)?;
            Ok(None)
        }
    }
}

/// Store `snapshot` under `key`.
pub fn save_snapshot(
    store: &dyn SessionStore,
    key: &str,
    snapshot: &PersistedSession,
) -> Result<(), WalletError> {
    let raw = serde_json::to_string(snapshot)?;
    store.set(key, &raw)
}
