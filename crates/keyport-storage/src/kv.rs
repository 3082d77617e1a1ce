//! The key-value store seam and its in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use keyport_types::{KeyportError, Result};

/// A single-writer, read-your-writes string store.
///
/// The engine never relies on transactions: anything that must be
/// atomic is assembled in memory and written with one [`set`](Self::set).
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A [`KeyValueStore`] kept in process memory.
///
/// Used by tests and by embedders that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> KeyportError {
    KeyportError::StorageError {
        reason: "memory store lock poisoned".into(),
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
