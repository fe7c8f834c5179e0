//! Durable key/value storage backing the session store.
//!
//! The browser front end kept the token and the user profile under separate
//! `localStorage` keys. [`SessionStorage`] is that contract: a small string
//! key/value store that survives restarts.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{ErrorCode, ErrorContext, Result, VoyageError};

/// Key holding the raw session token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the serialized user identity.
pub const USER_KEY: &str = "currentUser";

/// Key holding the durable token of a deferred action.
pub const PENDING_INTENT_KEY: &str = "pendingIntent";

/// Key holding the ids of recently resumed intents.
pub const CONSUMED_INTENTS_KEY: &str = "consumedIntents";

/// A durable string key/value store.
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several values in one step.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several values in one step.
    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory storage
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-local storage, used in tests and for throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// File storage
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON file storage (`~/.voyage/session.json` by default).
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written session behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage at the default location under the home directory.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            VoyageError::new(ErrorCode::StorageError, "Could not determine home directory")
        })?;
        Ok(Self::new(home.join(".voyage").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            std::fs::read_to_string(&self.path).with_error_code(ErrorCode::StorageError)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            VoyageError::with_internal(
                ErrorCode::StorageError,
                "Session file is corrupted",
                format!("{}: {}", self.path.display(), e),
            )
            .with_source(e)
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_error_code(ErrorCode::StorageError)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).with_error_code(ErrorCode::StorageError)?;
        std::fs::rename(&tmp, &self.path).with_error_code(ErrorCode::StorageError)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        apply(&mut values);
        self.write_all(&values)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.update(|values| {
            for (key, value) in entries {
                values.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        self.update(|values| {
            for key in keys {
                values.remove(*key);
            }
        })
    }
}
