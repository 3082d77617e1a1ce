//! Durable [`KeyValueStore`] backed by a sled tree.

use std::path::Path;

use keyport_types::{KeyportError, Result};

use crate::kv::KeyValueStore;

/// Name of the sled tree holding user data.
const USER_DATA_TREE: &str = "user_data";

/// sled-backed key-value store.
///
/// Every [`set`](KeyValueStore::set) is flushed before returning, so a
/// keyring written by the migrator survives a crash right after.
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// [`KeyportError::StorageError`] if the database or tree cannot be
    /// opened.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| KeyportError::StorageError {
            reason: format!("failed to open sled database: {e}"),
        })?;
        Self::from_db(db)
    }

    /// Opens a throwaway database that is deleted on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| KeyportError::StorageError {
                reason: format!("failed to open temporary sled database: {e}"),
            })?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(USER_DATA_TREE)
            .map_err(|e| KeyportError::StorageError {
                reason: format!("failed to open tree '{USER_DATA_TREE}': {e}"),
            })?;
        Ok(Self { db, tree })
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(|e| KeyportError::StorageError {
            reason: format!("failed to flush database: {e}"),
        })?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .tree
            .get(key.as_bytes())
            .map_err(|e| KeyportError::StorageError {
                reason: format!("failed to read '{key}': {e}"),
            })?;
        value
            .map(|bytes| {
                String::from_utf8(bytes.to_vec()).map_err(|_| KeyportError::StorageError {
                    reason: format!("value under '{key}' is not valid UTF-8"),
                })
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| KeyportError::StorageError {
                reason: format!("failed to write '{key}': {e}"),
            })?;
        self.tree.flush().map_err(|e| KeyportError::StorageError {
            reason: format!("failed to flush '{key}': {e}"),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_store_roundtrip() -> Result<()> {
        let store = SledStore::temporary()?;
        assert_eq!(store.get("currentProfileId")?, None);
        store.set("currentProfileId", "alice")?;
        assert_eq!(store.get("currentProfileId")?, Some("alice".into()));
        store.flush()?;
        Ok(())
    }

    #[test]
    fn reopen_keeps_values() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("keyport_sled_test_{}", std::process::id()));
        {
            let store = SledStore::open(&dir)?;
            store.set("k", "v")?;
        }
        let reopened = SledStore::open(&dir)?;
        let value = reopened.get("k");
        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(value?, Some("v".into()));
        Ok(())
    }
}
