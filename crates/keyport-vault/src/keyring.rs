//! Lock/unlock session over a current-version keyring.
//!
//! A [`Keyring`] wraps a [`KeyringState`] and holds decrypted
//! [`KeyMaterial`] only while in [`SessionState::Unlocked`]. Locking
//! drops the material, which zeroizes the private scalar.

use std::sync::Arc;

use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_crypto::key_material::{KeyMaterial, PrivateKey};
use keyport_types::{EvmAddress, KeyportError, Result, SignAlgo};

use crate::cipher::{VaultCipher, VaultSecret};
use crate::entry::{KeyringState, VaultEntry, VaultVersion};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lock state of a [`Keyring`].
pub enum SessionState {
    /// No private key in memory.
    Locked,
    /// One entry's key is decrypted and available for signing.
    Unlocked(UnlockedEntry),
}

/// The decrypted key of one vault entry.
pub struct UnlockedEntry {
    entry_id: String,
    sign_algo: SignAlgo,
    material: KeyMaterial,
}

impl UnlockedEntry {
    /// Id of the unlocked entry.
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Algorithm of the unlocked key.
    pub fn sign_algo(&self) -> SignAlgo {
        self.sign_algo
    }

    /// The decrypted key material.
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }
}

// ---------------------------------------------------------------------------
// Keyring
// ---------------------------------------------------------------------------

/// A keyring with a lock/unlock lifecycle.
///
/// Only current-version keyrings can be opened; older ones must go
/// through [`VaultMigrator`](crate::migrator::VaultMigrator) first so the
/// algorithm is known without guessing.
pub struct Keyring {
    state: KeyringState,
    session: SessionState,
    cipher: Arc<dyn VaultCipher>,
    registry: Arc<AlgorithmRegistry>,
}

impl Keyring {
    /// Opens a keyring in the `Locked` state.
    ///
    /// # Errors
    ///
    /// [`KeyportError::InvalidKeyring`] if `state` is not at
    /// [`VaultVersion::CURRENT`].
    pub fn open(
        state: KeyringState,
        cipher: Arc<dyn VaultCipher>,
        registry: Arc<AlgorithmRegistry>,
    ) -> Result<Self> {
        if !state.is_current() {
            return Err(KeyportError::InvalidKeyring {
                reason: format!(
                    "keyring is {} but sessions need {}; migrate it first",
                    state.version(),
                    VaultVersion::CURRENT
                ),
            });
        }
        Ok(Self {
            state,
            session: SessionState::Locked,
            cipher,
            registry,
        })
    }

    /// Returns the underlying durable state.
    pub fn state(&self) -> &KeyringState {
        &self.state
    }

    /// Returns `true` while a key is decrypted.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.session, SessionState::Unlocked(_))
    }

    /// Decrypts `entry_id` and verifies it against its stored public key.
    ///
    /// Any previously unlocked entry is locked first, so a failed attempt
    /// leaves the keyring locked.
    ///
    /// # Errors
    ///
    /// - [`KeyportError::InvalidKeyring`] if no such entry exists.
    /// - [`KeyportError::BadSecret`] / [`KeyportError::CorruptData`] from
    ///   the cipher.
    /// - [`KeyportError::CorruptData`] if the decrypted key does not match
    ///   the stored public key.
    pub fn unlock(&mut self, entry_id: &str, secret: &VaultSecret) -> Result<()> {
        self.lock();
        let entry = match self.state.entry(entry_id) {
            Some(VaultEntry::V3(entry)) => entry,
            Some(_) | None => {
                return Err(KeyportError::InvalidKeyring {
                    reason: format!("no v3 entry with id {entry_id}"),
                })
            }
        };

        let raw = self.cipher.decrypt(&entry.encrypted_data, secret)?;
        let private_key = PrivateKey::from_slice(&raw).map_err(|_| KeyportError::CorruptData {
            reason: format!("entry {entry_id} does not hold a 32-byte scalar"),
        })?;
        let material = KeyMaterial::from_private_key(&self.registry, entry.sign_algo, private_key)?;

        if material.public_key(entry.sign_algo)? != &entry.public_key {
            return Err(KeyportError::CorruptData {
                reason: format!("entry {entry_id} key does not match its public key"),
            });
        }

        tracing::debug!(entry_id, "keyring unlocked");
        self.session = SessionState::Unlocked(UnlockedEntry {
            entry_id: entry_id.to_string(),
            sign_algo: entry.sign_algo,
            material,
        });
        Ok(())
    }

    /// Drops the decrypted key. No-op if already locked.
    pub fn lock(&mut self) {
        self.session = SessionState::Locked;
    }

    /// Returns the unlocked entry.
    ///
    /// # Errors
    ///
    /// [`KeyportError::CryptoError`] while locked.
    pub fn unlocked_entry(&self) -> Result<&UnlockedEntry> {
        match &self.session {
            SessionState::Unlocked(unlocked) => Ok(unlocked),
            SessionState::Locked => Err(KeyportError::CryptoError {
                reason: "keyring is locked; call unlock() first".into(),
            }),
        }
    }

    /// Address of the unlocked entry.
    pub fn address(&self) -> Result<EvmAddress> {
        let unlocked = self.unlocked_entry()?;
        unlocked.material.address(unlocked.sign_algo)
    }

    /// Signs `message` with the unlocked key.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let unlocked = self.unlocked_entry()?;
        unlocked
            .material
            .sign(&self.registry, unlocked.sign_algo, message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
