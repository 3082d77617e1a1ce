//! Versioned vault entries and the keyring state that holds them.
//!
//! Schema history:
//!
//! | Version | Fields |
//! |---------|--------|
//! | 2 | `id`, `encryptedData` (algorithm unknown until decrypted) |
//! | 3 | `id`, `publicKey`, `signAlgo`, `encryptedData` |
//!
//! On disk both versions are one JSON object tagged by `vaultVersion`.
//! In memory they are the closed enum [`VaultEntry`]; adding a version
//! means adding a variant here and one step in the migrator.

use std::collections::HashSet;
use std::fmt;

use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_crypto::key_material::{KeyMaterial, PublicKey};
use keyport_types::{EvmAddress, KeyportError, Result, SignAlgo, Timestamp};
use serde::{Deserialize, Serialize};

use crate::cipher::{VaultCipher, VaultSecret};

// ---------------------------------------------------------------------------
// VaultVersion
// ---------------------------------------------------------------------------

/// Schema version of a vault entry or keyring.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VaultVersion {
    /// Encrypted blob only.
    V2,
    /// Blob plus cleartext public key and algorithm tag.
    V3,
}

impl VaultVersion {
    /// The version new entries are written in.
    pub const CURRENT: VaultVersion = VaultVersion::V3;

    /// Returns the numeric version.
    pub fn number(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Parses a numeric version.
    ///
    /// # Errors
    ///
    /// [`KeyportError::InvalidKeyring`] for versions this build does not know.
    pub fn from_number(number: u8) -> Result<Self> {
        match number {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(KeyportError::InvalidKeyring {
                reason: format!("unsupported vault version {other}"),
            }),
        }
    }

    /// Returns `true` for [`VaultVersion::CURRENT`].
    pub fn is_current(self) -> bool {
        self == Self::CURRENT
    }
}

impl TryFrom<u8> for VaultVersion {
    type Error = KeyportError;

    fn try_from(number: u8) -> Result<Self> {
        Self::from_number(number)
    }
}

impl From<VaultVersion> for u8 {
    fn from(version: VaultVersion) -> u8 {
        version.number()
    }
}

impl fmt::Display for VaultVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A version 2 entry: one encrypted legacy key, algorithm unknown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultEntryV2 {
    /// Stable entry id.
    pub id: String,
    /// Encrypted SEC1 private key document.
    pub encrypted_data: String,
}

impl VaultEntryV2 {
    /// Encrypts a private key in the legacy SEC1 layout.
    ///
    /// Used to build fixtures and to import keys exported by old clients.
    pub fn seal_legacy(
        id: impl Into<String>,
        registry: &AlgorithmRegistry,
        cipher: &dyn VaultCipher,
        material: &KeyMaterial,
        algo: SignAlgo,
        secret: &VaultSecret,
    ) -> Result<Self> {
        let der = registry.encode_legacy_key(algo, material.pair(algo)?.private_key())?;
        Ok(Self {
            id: id.into(),
            encrypted_data: cipher.encrypt(&der, secret)?,
        })
    }
}

/// A version 3 entry: encrypted raw scalar plus cleartext public key
/// and algorithm, so the address is known without decryption.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultEntryV3 {
    /// Stable entry id, carried over from the entry it was migrated from.
    pub id: String,
    /// Uncompressed public key.
    pub public_key: PublicKey,
    /// Signature algorithm of the key.
    pub sign_algo: SignAlgo,
    /// Encrypted 32-byte private scalar.
    pub encrypted_data: String,
}

impl VaultEntryV3 {
    /// Encrypts the `algo` key of `material` as a current-version entry.
    pub fn seal(
        id: impl Into<String>,
        cipher: &dyn VaultCipher,
        material: &KeyMaterial,
        algo: SignAlgo,
        secret: &VaultSecret,
    ) -> Result<Self> {
        let pair = material.pair(algo)?;
        Ok(Self {
            id: id.into(),
            public_key: pair.public_key().clone(),
            sign_algo: algo,
            encrypted_data: cipher.encrypt(pair.private_key().as_bytes(), secret)?,
        })
    }

    /// Chain address of the entry's key.
    pub fn address(&self) -> EvmAddress {
        self.public_key.address()
    }
}

/// One encrypted key record, tagged by schema version.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVaultEntry", into = "RawVaultEntry")]
pub enum VaultEntry {
    /// Schema version 2.
    V2(VaultEntryV2),
    /// Schema version 3.
    V3(VaultEntryV3),
}

impl VaultEntry {
    /// Returns the entry id.
    pub fn id(&self) -> &str {
        match self {
            Self::V2(e) => &e.id,
            Self::V3(e) => &e.id,
        }
    }

    /// Returns the schema version.
    pub fn version(&self) -> VaultVersion {
        match self {
            Self::V2(_) => VaultVersion::V2,
            Self::V3(_) => VaultVersion::V3,
        }
    }

    /// Returns the encrypted blob.
    pub fn encrypted_data(&self) -> &str {
        match self {
            Self::V2(e) => &e.encrypted_data,
            Self::V3(e) => &e.encrypted_data,
        }
    }

    /// Returns the algorithm, when the schema records it.
    pub fn sign_algo(&self) -> Option<SignAlgo> {
        match self {
            Self::V2(_) => None,
            Self::V3(e) => Some(e.sign_algo),
        }
    }

    /// Returns the public key, when the schema records it.
    pub fn public_key(&self) -> Option<&PublicKey> {
        match self {
            Self::V2(_) => None,
            Self::V3(e) => Some(&e.public_key),
        }
    }

    /// Returns the chain address, when derivable without decryption.
    pub fn address(&self) -> Option<EvmAddress> {
        self.public_key().map(PublicKey::address)
    }
}

impl From<VaultEntryV2> for VaultEntry {
    fn from(entry: VaultEntryV2) -> Self {
        Self::V2(entry)
    }
}

impl From<VaultEntryV3> for VaultEntry {
    fn from(entry: VaultEntryV3) -> Self {
        Self::V3(entry)
    }
}

/// Wire form shared by every entry version.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVaultEntry {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sign_algo: Option<SignAlgo>,
    encrypted_data: String,
    vault_version: VaultVersion,
}

impl TryFrom<RawVaultEntry> for VaultEntry {
    type Error = KeyportError;

    fn try_from(raw: RawVaultEntry) -> Result<Self> {
        match raw.vault_version {
            VaultVersion::V2 => {
                if raw.public_key.is_some() || raw.sign_algo.is_some() {
                    return Err(KeyportError::InvalidKeyring {
                        reason: format!("v2 entry {} carries v3 fields", raw.id),
                    });
                }
                Ok(Self::V2(VaultEntryV2 {
                    id: raw.id,
                    encrypted_data: raw.encrypted_data,
                }))
            }
            VaultVersion::V3 => {
                let (Some(public_key), Some(sign_algo)) = (raw.public_key, raw.sign_algo) else {
                    return Err(KeyportError::InvalidKeyring {
                        reason: format!("v3 entry {} lacks publicKey or signAlgo", raw.id),
                    });
                };
                Ok(Self::V3(VaultEntryV3 {
                    id: raw.id,
                    public_key,
                    sign_algo,
                    encrypted_data: raw.encrypted_data,
                }))
            }
        }
    }
}

impl From<VaultEntry> for RawVaultEntry {
    fn from(entry: VaultEntry) -> Self {
        match entry {
            VaultEntry::V2(e) => Self {
                id: e.id,
                public_key: None,
                sign_algo: None,
                encrypted_data: e.encrypted_data,
                vault_version: VaultVersion::V2,
            },
            VaultEntry::V3(e) => Self {
                id: e.id,
                public_key: Some(e.public_key),
                sign_algo: Some(e.sign_algo),
                encrypted_data: e.encrypted_data,
                vault_version: VaultVersion::V3,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// KeyringState
// ---------------------------------------------------------------------------

/// The durable keyring: every entry of one profile plus the shared
/// schema version.
///
/// # Invariants
///
/// - Every entry has version `vault_version`.
/// - Entry ids are unique.
///
/// Both are checked on construction and on deserialization, so a state
/// mixing versions cannot be built or loaded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKeyringState", into = "RawKeyringState")]
pub struct KeyringState {
    booted: Timestamp,
    vault: Vec<VaultEntry>,
    vault_version: VaultVersion,
}

impl KeyringState {
    /// Builds a validated keyring state.
    ///
    /// # Errors
    ///
    /// [`KeyportError::InvalidKeyring`] if an entry's version differs from
    /// `vault_version` or two entries share an id.
    pub fn new(
        booted: Timestamp,
        vault_version: VaultVersion,
        vault: Vec<VaultEntry>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(vault.len());
        for entry in &vault {
            if entry.version() != vault_version {
                return Err(KeyportError::InvalidKeyring {
                    reason: format!(
                        "entry {} is {} but keyring is {vault_version}",
                        entry.id(),
                        entry.version()
                    ),
                });
            }
            if !seen.insert(entry.id()) {
                return Err(KeyportError::InvalidKeyring {
                    reason: format!("duplicate entry id {}", entry.id()),
                });
            }
        }
        Ok(Self {
            booted,
            vault,
            vault_version,
        })
    }

    /// Returns the boot marker.
    pub fn booted(&self) -> &Timestamp {
        &self.booted
    }

    /// Returns the entries in stored order.
    pub fn entries(&self) -> &[VaultEntry] {
        &self.vault
    }

    /// Returns the shared schema version.
    pub fn version(&self) -> VaultVersion {
        self.vault_version
    }

    /// Returns `true` if no migration is needed.
    pub fn is_current(&self) -> bool {
        self.vault_version.is_current()
    }

    /// Looks an entry up by id.
    pub fn entry(&self, id: &str) -> Option<&VaultEntry> {
        self.vault.iter().find(|e| e.id() == id)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeyringState {
    booted: Timestamp,
    vault: Vec<VaultEntry>,
    vault_version: VaultVersion,
}

impl TryFrom<RawKeyringState> for KeyringState {
    type Error = KeyportError;

    fn try_from(raw: RawKeyringState) -> Result<Self> {
        Self::new(raw.booted, raw.vault_version, raw.vault)
    }
}

impl From<KeyringState> for RawKeyringState {
    fn from(state: KeyringState) -> Self {
        Self {
            booted: state.booted,
            vault: state.vault,
            vault_version: state.vault_version,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
