//! Typed keyring persistence over a [`KeyValueStore`].

use std::sync::Arc;

use keyport_types::{KeyportError, ProfileId, Result};
use keyport_vault::entry::KeyringState;

use crate::kv::KeyValueStore;

/// Loads and saves [`KeyringState`]s as JSON under `<prefix><profile_id>`.
#[derive(Clone)]
pub struct KeyringStore {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl KeyringStore {
    /// Creates a keyring view over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key_for(&self, profile_id: &ProfileId) -> String {
        format!("{}{}", self.prefix, profile_id)
    }

    /// Loads the keyring of `profile_id`.
    ///
    /// # Errors
    ///
    /// - [`KeyportError::KeyringNotFound`] if nothing is stored.
    /// - [`KeyportError::SerializationError`] or
    ///   [`KeyportError::InvalidKeyring`] if the stored JSON does not
    ///   describe a valid keyring.
    pub fn load(&self, profile_id: &ProfileId) -> Result<KeyringState> {
        let raw = self
            .store
            .get(&self.key_for(profile_id))?
            .ok_or_else(|| KeyportError::KeyringNotFound {
                profile_id: profile_id.to_string(),
            })?;
        let state: KeyringState = serde_json::from_str(&raw)?;
        Ok(state)
    }

    /// Replaces the keyring of `profile_id` with one write.
    pub fn save(&self, profile_id: &ProfileId, state: &KeyringState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.store.set(&self.key_for(profile_id), &json)?;
        tracing::debug!(%profile_id, version = %state.version(), "keyring saved");
        Ok(())
    }
}
