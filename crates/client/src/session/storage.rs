//! Persistence for the auth session.
//!
//! Only the `auth` slice is ever written; resource caches always start cold.
//! The blob layout is `{ "auth": { "token", "profile", "isAuthenticated" } }`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::Profile;

/// Errors that can occur while reading or writing persisted session state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session storage is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The persisted blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub auth: PersistedAuth,
}

/// The persisted auth slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAuth {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Backend for the persisted session blob.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted state. A missing blob is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<PersistedState>, StorageError>;

    /// Overwrite the persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be written.
    fn save(&self, state: &PersistedState) -> Result<(), StorageError>;

    /// Remove the persisted state entirely. Purging an absent blob succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be removed.
    fn purge(&self) -> Result<(), StorageError>;
}

// =============================================================================
// FileStorage
// =============================================================================

/// Stores the session blob as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn purge(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage, used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted blob, as after a reload.
    #[must_use]
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// Current blob, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }

    fn purge(&self) -> Result<(), StorageError> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vendor-portal-storage-{}-{name}", std::process::id()))
            .join("session.json")
    }

    #[test]
    fn test_persisted_blob_layout() {
        let state = PersistedState {
            auth: PersistedAuth {
                token: Some("tkn".to_string()),
                profile: None,
                is_authenticated: true,
            },
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"auth": {"token": "tkn", "profile": null, "isAuthenticated": true}})
        );
    }

    #[test]
    fn test_file_storage_roundtrip_and_purge() {
        let path = temp_path("roundtrip");
        let storage = FileStorage::new(&path);
        assert!(storage.load().unwrap().is_none());

        let state = PersistedState {
            auth: PersistedAuth {
                token: Some("abc".to_string()),
                profile: None,
                is_authenticated: true,
            },
        };
        storage.save(&state).unwrap();
        assert_eq!(storage.load().unwrap(), Some(state));

        storage.purge().unwrap();
        assert!(storage.load().unwrap().is_none());
        // Purging twice is fine
        storage.purge().unwrap();
    }

    #[test]
    fn test_file_storage_rejects_corrupt_blob() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        let storage = FileStorage::new(&path);
        assert!(matches!(storage.load(), Err(StorageError::Serde(_))));
        storage.purge().unwrap();
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());
        storage.save(&PersistedState::default()).unwrap();
        assert!(storage.snapshot().is_some());
        storage.purge().unwrap();
        assert!(storage.snapshot().is_none());
    }
}
