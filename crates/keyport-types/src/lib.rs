//! Core shared types for the keyport vault migration engine.
//!
//! This crate defines the fundamental types used across the workspace:
//! chain addresses, profile identifiers, signature algorithm tags,
//! timestamps and the central [`KeyportError`]. Crate-specific types
//! (vault entries, batches, events) live with the crate that owns them.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// EvmAddress
// ---------------------------------------------------------------------------

/// 20-byte account address on an EVM-compatible chain.
///
/// Derived from the last 20 bytes of Keccak-256 over an uncompressed
/// public key point. Displayed as lowercase `0x`-prefixed hex and
/// serialized as that string so JSON fixtures stay readable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    /// The fixed byte length of an address.
    pub const LEN: usize = 20;

    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates a new `EvmAddress` from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl From<[u8; 20]> for EvmAddress {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for EvmAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for EvmAddress {
    type Err = KeyportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|_| KeyportError::InvalidAddress {
            reason: format!("invalid hex encoding: {s:?}"),
        })?;
        if bytes.len() != Self::LEN {
            return Err(KeyportError::InvalidAddress {
                reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for EvmAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ProfileId
// ---------------------------------------------------------------------------

/// Identifier of one profile (account) inside a multi-profile keyring.
///
/// Opaque to the engine; only required to be non-empty.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

impl ProfileId {
    /// Creates a `ProfileId`, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(KeyportError::ConfigError {
                reason: "profile id must not be empty".into(),
            });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProfileId {
    type Error = KeyportError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProfileId {
    type Err = KeyportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// SignAlgo
// ---------------------------------------------------------------------------

/// Signature algorithm tag recorded in cleartext on current vault entries.
///
/// Serialized as its numeric code so persisted keyrings stay compatible
/// with the wallet's on-disk schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SignAlgo {
    /// ECDSA over NIST P-256 (secp256r1).
    P256,
    /// ECDSA over secp256k1.
    Secp256k1,
}

impl SignAlgo {
    /// All algorithms known to this build, in code order.
    pub const ALL: [SignAlgo; 2] = [SignAlgo::P256, SignAlgo::Secp256k1];

    /// Returns the persisted numeric code.
    pub fn code(self) -> u8 {
        match self {
            Self::P256 => 1,
            Self::Secp256k1 => 2,
        }
    }

    /// Looks up an algorithm by its persisted numeric code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::P256),
            2 => Ok(Self::Secp256k1),
            other => Err(KeyportError::UnknownAlgorithm {
                reason: format!("unrecognized signature algorithm code {other}"),
            }),
        }
    }
}

impl TryFrom<u8> for SignAlgo {
    type Error = KeyportError;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code)
    }
}

impl From<SignAlgo> for u8 {
    fn from(algo: SignAlgo) -> Self {
        algo.code()
    }
}

impl fmt::Display for SignAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P256 => write!(f, "P256"),
            Self::Secp256k1 => write!(f, "SECP256K1"),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp in ISO 8601 format.
///
/// Used as the `booted` marker of a keyring. All timestamps are UTC so
/// persisted state compares equal regardless of host timezone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = KeyportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| KeyportError::ConfigError {
                reason: format!("invalid ISO 8601 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// KeyportError
// ---------------------------------------------------------------------------

/// Central error type for keyport.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum. Only [`KeyportError::SubmissionFailed`] can be
/// retryable; every other variant is final for the run that produced it.
#[derive(Debug, Error)]
pub enum KeyportError {
    /// The key's curve or signature scheme is not recognized.
    #[error("unknown algorithm: {reason}")]
    UnknownAlgorithm {
        /// What could not be identified.
        reason: String,
    },

    /// Decryption failed because the secret does not open the blob.
    #[error("bad secret: the passphrase does not unlock this vault entry")]
    BadSecret,

    /// Stored ciphertext or decrypted key material is malformed.
    #[error("corrupt data: {reason}")]
    CorruptData {
        /// Description of the corruption.
        reason: String,
    },

    /// A single vault entry failed to migrate; the keyring was left untouched.
    #[error("vault entry {entry_id} failed to migrate: {source}")]
    VaultEntryFailed {
        /// Stable id of the failing entry.
        entry_id: String,
        /// Underlying failure.
        #[source]
        source: Box<KeyportError>,
    },

    /// No profile is marked as current in the user-data store.
    #[error("no current profile is set")]
    NoCurrentProfile,

    /// No keyring is stored for the profile.
    #[error("no keyring stored for profile {profile_id}")]
    KeyringNotFound {
        /// Profile whose keyring is missing.
        profile_id: String,
    },

    /// A keyring is structurally invalid (mixed versions, duplicate ids).
    #[error("invalid keyring: {reason}")]
    InvalidKeyring {
        /// Description of the structural problem.
        reason: String,
    },

    /// The source key for asset migration cannot be determined.
    #[error("missing source key: {reason}")]
    MissingSourceKey {
        /// Why no source key was available.
        reason: String,
    },

    /// The migration destination is empty or equals the source.
    #[error("invalid destination: {reason}")]
    InvalidDestination {
        /// Why the destination was rejected.
        reason: String,
    },

    /// An address string is malformed.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Description of the parse failure.
        reason: String,
    },

    /// Another migration for the same profile is already running.
    #[error("migration already in progress for profile {profile_id}")]
    MigrationInProgress {
        /// Profile that is busy.
        profile_id: String,
    },

    /// Handing the batch to the chain failed.
    #[error("submission failed (retryable: {retryable}): {reason}")]
    SubmissionFailed {
        /// Whether resubmitting the unchanged batch may succeed.
        retryable: bool,
        /// Description of the failure.
        reason: String,
    },

    /// The caller cancelled the run before the submission hand-off.
    #[error("cancelled: {reason}")]
    Cancelled {
        /// Where the cancellation was observed.
        reason: String,
    },

    /// A cryptographic operation failed (derivation, signing, encryption).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A storage operation failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// Encoding or decoding of persisted data failed.
    #[error("serialization error: {reason}")]
    SerializationError {
        /// Human-readable description of the serialization failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl KeyportError {
    /// Returns `true` if repeating the same operation unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionFailed { retryable: true, .. })
    }

    /// Returns the id of the vault entry that caused this error, if any.
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            Self::VaultEntryFailed { entry_id, .. } => Some(entry_id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for KeyportError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`KeyportError`].
pub type Result<T> = std::result::Result<T, KeyportError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
