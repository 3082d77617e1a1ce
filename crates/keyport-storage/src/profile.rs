//! Resolution of the current profile.
//!
//! The current-profile pointer lives in the user-data store. It is read
//! fresh on every call, never cached, so a run always acts on the
//! profile that is current when it starts.

use std::sync::Arc;

use keyport_types::{KeyportError, ProfileId, Result};

use crate::kv::KeyValueStore;

/// Reads (and, for onboarding, writes) the current-profile pointer.
#[derive(Clone)]
pub struct CurrentProfileResolver {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl CurrentProfileResolver {
    /// Creates a resolver reading the pointer from `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Returns the id of the current profile.
    ///
    /// Values written by JSON-encoding clients (`"\"alice\""`) are
    /// accepted as well as bare ids.
    ///
    /// # Errors
    ///
    /// [`KeyportError::NoCurrentProfile`] if the pointer is unset or blank.
    pub fn resolve_current_profile_id(&self) -> Result<ProfileId> {
        let raw = self
            .store
            .get(&self.key)?
            .ok_or(KeyportError::NoCurrentProfile)?;
        let id = match serde_json::from_str::<String>(&raw) {
            Ok(decoded) => decoded,
            Err(_) => raw,
        };
        ProfileId::new(id).map_err(|_| KeyportError::NoCurrentProfile)
    }

    /// Points the current profile at `profile_id`.
    pub fn set_current_profile_id(&self, profile_id: &ProfileId) -> Result<()> {
        self.store.set(&self.key, profile_id.as_str())
    }
}
