//! Per-profile single-flight registry.
//!
//! A run claims its profile with [`InFlightRegistry::try_acquire`] and
//! holds the returned [`InFlightGuard`] until it finishes. The claim is
//! released when the guard drops, on every exit path.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use keyport_types::{KeyportError, ProfileId, Result};

/// Set of profiles with a run in progress.
///
/// Cheap to clone; clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<ProfileId>>>,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `profile_id` for the caller.
    ///
    /// # Errors
    ///
    /// [`KeyportError::MigrationInProgress`] if another run holds it.
    pub fn try_acquire(&self, profile_id: &ProfileId) -> Result<InFlightGuard> {
        let mut active = self.active.lock().map_err(|_| KeyportError::StorageError {
            reason: "in-flight registry lock poisoned".into(),
        })?;
        if !active.insert(profile_id.clone()) {
            return Err(KeyportError::MigrationInProgress {
                profile_id: profile_id.to_string(),
            });
        }
        Ok(InFlightGuard {
            active: Arc::clone(&self.active),
            profile_id: profile_id.clone(),
        })
    }

    /// Returns `true` if a run currently holds `profile_id`.
    pub fn is_active(&self, profile_id: &ProfileId) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(profile_id))
            .unwrap_or(false)
    }
}

/// Claim on one profile. Releases it on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<ProfileId>>>,
    profile_id: ProfileId,
}

impl InFlightGuard {
    /// The claimed profile.
    pub fn profile_id(&self) -> &ProfileId {
        &self.profile_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // A poisoned lock still holds valid data; release the claim anyway.
        let mut active = match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.profile_id);
    }
}
