//! Whole-keyring schema migration.
//!
//! [`VaultMigrator`] walks a [`KeyringState`] forward one version at a
//! time through a chain of [`MigrationStep`]s until it reaches
//! [`VaultVersion::CURRENT`]. Each step converts every entry or none:
//! the new state is assembled in memory and only returned once all
//! entries succeeded, so the caller never holds (or persists) a keyring
//! with mixed versions.
//!
//! Migration has no side effects. Persisting the returned state is the
//! caller's decision, which makes a dry run the same call without the
//! write.

use std::sync::Arc;

use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_types::{KeyportError, Result};

use crate::cipher::{VaultCipher, VaultSecret};
use crate::entry::{KeyringState, VaultEntry, VaultEntryV3, VaultVersion};

// ---------------------------------------------------------------------------
// MigrationStep
// ---------------------------------------------------------------------------

/// Converts one entry from one schema version to the next.
pub trait MigrationStep: Send + Sync {
    /// Version this step reads.
    fn from_version(&self) -> VaultVersion;

    /// Version this step writes.
    fn to_version(&self) -> VaultVersion;

    /// Converts one entry. The entry id must be preserved.
    fn migrate_entry(&self, entry: &VaultEntry, secret: &VaultSecret) -> Result<VaultEntry>;
}

/// v2 → v3: decrypt the legacy SEC1 key, identify its curve, derive the
/// public key and re-seal the raw scalar.
pub struct V2ToV3 {
    cipher: Arc<dyn VaultCipher>,
    registry: Arc<AlgorithmRegistry>,
}

impl V2ToV3 {
    /// Creates the step.
    pub fn new(cipher: Arc<dyn VaultCipher>, registry: Arc<AlgorithmRegistry>) -> Self {
        Self { cipher, registry }
    }
}

impl MigrationStep for V2ToV3 {
    fn from_version(&self) -> VaultVersion {
        VaultVersion::V2
    }

    fn to_version(&self) -> VaultVersion {
        VaultVersion::V3
    }

    fn migrate_entry(&self, entry: &VaultEntry, secret: &VaultSecret) -> Result<VaultEntry> {
        let VaultEntry::V2(legacy) = entry else {
            return Err(KeyportError::InvalidKeyring {
                reason: format!("entry {} is {}, expected v2", entry.id(), entry.version()),
            });
        };

        // Plaintext and scalar are zeroized when they leave scope,
        // on success and on every error path.
        let der = self.cipher.decrypt(&legacy.encrypted_data, secret)?;
        let (sign_algo, private_key) = self.registry.decode_legacy_key(&der)?;
        let public_key = self
            .registry
            .scheme(sign_algo)?
            .derive_public_key(&private_key)?;
        let encrypted_data = self.cipher.encrypt(private_key.as_bytes(), secret)?;

        tracing::debug!(entry_id = %legacy.id, algo = %sign_algo, "vault entry upgraded to v3");

        Ok(VaultEntry::V3(VaultEntryV3 {
            id: legacy.id.clone(),
            public_key,
            sign_algo,
            encrypted_data,
        }))
    }
}

// ---------------------------------------------------------------------------
// VaultMigrator
// ---------------------------------------------------------------------------

/// Upgrades keyrings to [`VaultVersion::CURRENT`].
pub struct VaultMigrator {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl VaultMigrator {
    /// Creates a migrator with every known step.
    pub fn new(cipher: Arc<dyn VaultCipher>, registry: Arc<AlgorithmRegistry>) -> Self {
        Self::with_steps(vec![Box::new(V2ToV3::new(cipher, registry))])
    }

    /// Creates a migrator from an explicit step chain.
    pub fn with_steps(steps: Vec<Box<dyn MigrationStep>>) -> Self {
        Self { steps }
    }

    /// Returns `true` if `state` is behind the current version.
    pub fn needs_migration(state: &KeyringState) -> bool {
        !state.is_current()
    }

    /// Migrates `state` to the current version.
    ///
    /// A current-version state is returned unchanged. Otherwise every
    /// entry passes through every remaining step; the first failing entry
    /// aborts the whole migration and `state` is left as it was.
    ///
    /// # Errors
    ///
    /// - [`KeyportError::VaultEntryFailed`] wrapping the entry's failure
    ///   (`BadSecret`, `CorruptData`, `UnknownAlgorithm`, ...) together
    ///   with its id.
    /// - [`KeyportError::InvalidKeyring`] if no step starts at the
    ///   state's version.
    pub fn migrate(&self, state: &KeyringState, secret: &VaultSecret) -> Result<KeyringState> {
        let mut current = state.clone();

        while !current.is_current() {
            let version = current.version();
            let step = self
                .steps
                .iter()
                .find(|s| s.from_version() == version)
                .ok_or_else(|| KeyportError::InvalidKeyring {
                    reason: format!("no migration step from {version}"),
                })?;
            if step.to_version() <= version {
                return Err(KeyportError::InvalidKeyring {
                    reason: format!("migration step from {version} does not move forward"),
                });
            }

            let migrated = current
                .entries()
                .iter()
                .map(|entry| {
                    step.migrate_entry(entry, secret).map_err(|e| {
                        tracing::warn!(entry_id = %entry.id(), error = %e, "vault entry migration failed");
                        KeyportError::VaultEntryFailed {
                            entry_id: entry.id().to_string(),
                            source: Box::new(e),
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            current = KeyringState::new(current.booted().clone(), step.to_version(), migrated)?;

            tracing::info!(
                from = %version,
                to = %current.version(),
                entries = current.entries().len(),
                "keyring migrated"
            );
        }

        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
