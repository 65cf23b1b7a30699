//! Persisted state storage
//!
//! The selector treats storage as a key/value settings backend holding one
//! blob. [`JsonFileStore`] keeps it in a JSON file; [`MemoryStore`] keeps it
//! in memory for tests and ephemeral sessions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::binding::PersistedState;
use crate::error::{Error, Result};

/// Load/save of the persisted binding state
///
/// Calls may block; the selector runs them on the blocking pool.
pub trait StateStore: Send + Sync {
    /// Saved state, or `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<PersistedState>>;

    /// Replace the saved state
    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// State stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        // the file is replaced whole
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))
    }
}

/// State kept in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `state`
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistedState {
        PersistedState {
            sources: vec![
                ("None".into(), "None".into()),
                ("CAM-A (Front)".into(), "10.0.0.5".into()),
            ],
            cameras: vec!["CAM-A (Front)".into(), "None".into()],
        }
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!dir.path().join("state.tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert_eq!(MemoryStore::with_state(sample()).load().unwrap(), Some(sample()));
    }
}
