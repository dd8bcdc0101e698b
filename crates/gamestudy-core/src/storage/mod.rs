//! Persistence gateway.
//!
//! Every component persists through [`Storage`], a namespaced JSON view over
//! a [`KeyValueStore`] backend. Storage is best-effort: when the backend is
//! missing or failing, reads return `None` and writes are dropped, and the
//! in-memory state keeps working for the rest of the session.

mod config;
pub mod database;

pub use config::{BackendKind, Config, GoalConfig, StorageConfig};
pub use database::SqliteStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Namespace prefix used when the config does not name one.
pub const DEFAULT_NAMESPACE: &str = "gameStudy:";

/// Returns the data directory, creating it if needed.
///
/// `GAMESTUDY_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/gamestudy[-dev]/`, with the `-dev` suffix when
/// `GAMESTUDY_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("GAMESTUDY_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("GAMESTUDY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("gamestudy-dev")
            } else {
                base_dir.join("gamestudy")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Raw string key-value backend.
///
/// Keys arrive fully qualified (namespace already applied).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Delete every key that starts with `prefix`.
    fn clear_prefix(&self, prefix: &str) -> Result<(), StorageError>;

    /// Whether writes survive the process.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Process-local backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        self.entries().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// Backend for runtimes without durable storage. Every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn clear_prefix(&self, _prefix: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// Namespaced, JSON-encoded view over a backend.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// In-memory storage under the default namespace.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_NAMESPACE)
    }

    /// Storage that never persists anything.
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableStore), DEFAULT_NAMESPACE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    fn qualify(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Stored value for `key`, or `None` if absent, undecodable, or the
    /// backend failed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(&self.qualify(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable stored value");
                None
            }
        }
    }

    /// Serialize and overwrite the value at `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage encode failed");
                return;
            }
        };
        if let Err(e) = self.backend.set(&self.qualify(key), &json) {
            tracing::warn!(key, error = %e, "storage write failed");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(&self.qualify(key)) {
            tracing::warn!(key, error = %e, "storage remove failed");
        }
    }

    /// Delete every key under this namespace. Other namespaces are untouched.
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear_prefix(&self.namespace) {
            tracing::warn!(namespace = %self.namespace, error = %e, "storage clear failed");
        }
    }
}
