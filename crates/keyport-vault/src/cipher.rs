//! Encryption collaborator for vault entry blobs.
//!
//! The vault never touches ciphers directly; it goes through
//! [`VaultCipher`], which opens a blob into raw key bytes and seals raw
//! key bytes into a blob. [`PassphraseCipher`] is the default
//! implementation.
//!
//! # Blob layout
//!
//! Blobs are stored as lowercase hex of:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       4   Magic bytes: b"KPVT"
//!   4       1   Version: 0x01
//!   5     100   Header body (bincode-serialized):
//!                 m_cost    : u32 (4B)
//!                 t_cost    : u32 (4B)
//!                 p_cost    : u32 (4B)
//!                 salt      : [u8; 32]
//!                 nonce     : [u8; 24]
//!                 key_check : [u8; 32]
//! 105     var   XChaCha20-Poly1305 ciphertext + tag
//! ```
//!
//! `key_check` is SHA3-256 over a fixed label and the derived key. It
//! lets [`PassphraseCipher::decrypt`] tell a wrong secret
//! ([`KeyportError::BadSecret`]) from a damaged blob
//! ([`KeyportError::CorruptData`]).

use keyport_crypto::aead::{self, SealedBox, NONCE_LEN, TAG_LEN};
use keyport_crypto::hash::sha3_256;
use keyport_crypto::kdf::{argon2id_derive_key, Argon2Params, DerivedKey};
use keyport_types::{KeyportError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes identifying a keyport vault blob.
pub const BLOB_MAGIC: [u8; 4] = *b"KPVT";

/// Current blob format version.
pub const BLOB_VERSION: u8 = 1;

/// Authenticated data bound to every blob ciphertext.
const BLOB_AAD: &[u8] = b"keyport-vault-blob-v1";

/// Label mixed into the key-check digest.
const KEY_CHECK_LABEL: &[u8] = b"keyport-key-check";

/// Bincode-serialized size of [`HeaderBody`]:
/// 3 × u32 (12) + [u8; 32] (32) + [u8; 24] (24) + [u8; 32] (32) = 100.
const HEADER_BODY_SIZE: usize = 12 + 32 + NONCE_LEN + 32;

/// Total header size: magic (4) + version (1) + body (100) = 105.
const TOTAL_HEADER_SIZE: usize = 4 + 1 + HEADER_BODY_SIZE;

/// Largest Argon2 memory cost accepted from a blob header (1 GiB in KiB).
pub const MAX_M_COST: u32 = 1024 * 1024;

/// Largest Argon2 iteration count accepted from a blob header.
pub const MAX_T_COST: u32 = 16;

/// Largest Argon2 parallelism accepted from a blob header.
pub const MAX_P_COST: u32 = 16;

// ---------------------------------------------------------------------------
// VaultSecret
// ---------------------------------------------------------------------------

/// The user secret that opens vault blobs. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultSecret(Vec<u8>);

impl VaultSecret {
    /// Wraps a UTF-8 passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(passphrase.as_bytes().to_vec())
    }

    /// Wraps raw secret bytes (for example a key from a hardware store).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// VaultSecret does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// VaultCipher
// ---------------------------------------------------------------------------

/// Opens and seals vault entry blobs.
///
/// Implementations must keep the two decryption failures apart:
/// [`KeyportError::BadSecret`] when `secret` does not open the blob, and
/// [`KeyportError::CorruptData`] when the blob itself is damaged.
pub trait VaultCipher: Send + Sync {
    /// Decrypts `blob` into raw key bytes.
    fn decrypt(&self, blob: &str, secret: &VaultSecret) -> Result<Zeroizing<Vec<u8>>>;

    /// Encrypts raw key bytes into a new blob.
    fn encrypt(&self, raw_key: &[u8], secret: &VaultSecret) -> Result<String>;
}

// ---------------------------------------------------------------------------
// PassphraseCipher
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct HeaderBody {
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
    salt: [u8; 32],
    nonce: [u8; NONCE_LEN],
    key_check: [u8; 32],
}

impl HeaderBody {
    /// Rejects cost parameters no keyport build would have written.
    /// The header is unauthenticated, so these are checked before any
    /// key derivation runs.
    fn check_costs(&self) -> Result<()> {
        if self.m_cost > MAX_M_COST || self.t_cost > MAX_T_COST || self.p_cost > MAX_P_COST {
            return Err(corrupt(format!(
                "blob header cost out of range: m_cost={}, t_cost={}, p_cost={}",
                self.m_cost, self.t_cost, self.p_cost
            )));
        }
        Ok(())
    }

    fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            m_cost: self.m_cost,
            t_cost: self.t_cost,
            p_cost: self.p_cost,
        }
    }
}

/// Argon2id + XChaCha20-Poly1305 vault cipher.
///
/// Every [`encrypt`](VaultCipher::encrypt) draws a fresh salt and nonce,
/// so sealing the same key twice yields different blobs. Decryption
/// reads the Argon2 parameters from the blob header, so blobs written
/// under older parameters keep opening.
#[derive(Clone, Debug, Default)]
pub struct PassphraseCipher {
    params: Argon2Params,
}

impl PassphraseCipher {
    /// Creates a cipher that seals new blobs with `params`.
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Returns the parameters used for new blobs.
    pub fn params(&self) -> &Argon2Params {
        &self.params
    }
}

fn corrupt(reason: impl Into<String>) -> KeyportError {
    KeyportError::CorruptData {
        reason: reason.into(),
    }
}

fn key_check(key: &DerivedKey) -> [u8; 32] {
    sha3_256(&[KEY_CHECK_LABEL, key.as_bytes()])
}

impl VaultCipher for PassphraseCipher {
    fn decrypt(&self, blob: &str, secret: &VaultSecret) -> Result<Zeroizing<Vec<u8>>> {
        let data = hex::decode(blob.trim()).map_err(|e| corrupt(format!("blob is not hex: {e}")))?;

        // 1. Size, magic, version before any deserialization.
        if data.len() < TOTAL_HEADER_SIZE + TAG_LEN {
            return Err(corrupt(format!(
                "blob truncated: expected at least {} bytes, got {}",
                TOTAL_HEADER_SIZE + TAG_LEN,
                data.len()
            )));
        }
        if data[0..4] != BLOB_MAGIC {
            return Err(corrupt("blob magic mismatch"));
        }
        if data[4] != BLOB_VERSION {
            return Err(corrupt(format!(
                "blob version mismatch: expected {BLOB_VERSION}, got {}",
                data[4]
            )));
        }

        // 2. Header body.
        let header: HeaderBody = bincode::deserialize(&data[5..TOTAL_HEADER_SIZE])
            .map_err(|e| corrupt(format!("failed to deserialize blob header: {e}")))?;
        header.check_costs()?;

        // 3. Derive and check the key. Unusable parameters mean the
        //    header was damaged, not that the secret is wrong.
        let key = argon2id_derive_key(secret.as_bytes(), &header.salt, &header.argon2_params())
            .map_err(|e| corrupt(format!("blob header parameters unusable: {e}")))?;
        if key_check(&key) != header.key_check {
            return Err(KeyportError::BadSecret);
        }

        // 4. Open the payload.
        let sealed = SealedBox {
            nonce: header.nonce,
            ciphertext: data[TOTAL_HEADER_SIZE..].to_vec(),
        };
        let plaintext = aead::open(key.as_bytes(), &sealed, BLOB_AAD)
            .map_err(|_| corrupt("blob ciphertext failed authentication"))?;
        Ok(Zeroizing::new(plaintext))
    }

    fn encrypt(&self, raw_key: &[u8], secret: &VaultSecret) -> Result<String> {
        let mut salt = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| KeyportError::CryptoError {
                reason: format!("failed to generate random salt: {e}"),
            })?;

        let key = argon2id_derive_key(secret.as_bytes(), &salt, &self.params)?;
        let sealed = aead::seal(key.as_bytes(), raw_key, BLOB_AAD)?;

        let header = HeaderBody {
            m_cost: self.params.m_cost,
            t_cost: self.params.t_cost,
            p_cost: self.params.p_cost,
            salt,
            nonce: sealed.nonce,
            key_check: key_check(&key),
        };
        let header_bytes =
            bincode::serialize(&header).map_err(|e| KeyportError::SerializationError {
                reason: format!("failed to serialize blob header: {e}"),
            })?;

        let mut data = Vec::with_capacity(TOTAL_HEADER_SIZE + sealed.ciphertext.len());
        data.extend_from_slice(&BLOB_MAGIC);
        data.push(BLOB_VERSION);
        data.extend_from_slice(&header_bytes);
        data.extend_from_slice(&sealed.ciphertext);
        Ok(hex::encode(data))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> PassphraseCipher {
        PassphraseCipher::new(Argon2Params::insecure_for_tests())
    }

    fn secret() -> VaultSecret {
        VaultSecret::from_passphrase("correct horse battery staple")
    }

    #[test]
    fn encrypt_decrypt_roundtrip() -> Result<()> {
        let blob = cipher().encrypt(&[0x5a; 32], &secret())?;
        let opened = cipher().decrypt(&blob, &secret())?;
        assert_eq!(opened.as_slice(), &[0x5a; 32]);
        Ok(())
    }

    #[test]
    fn header_size_matches_layout() -> Result<()> {
        let blob = cipher().encrypt(&[1u8; 32], &secret())?;
        assert_eq!(blob.len() / 2, TOTAL_HEADER_SIZE + 32 + TAG_LEN);
        assert!(blob.starts_with(&hex::encode(BLOB_MAGIC)));
        Ok(())
    }

    #[test]
    fn fresh_blob_each_time() -> Result<()> {
        let a = cipher().encrypt(&[7u8; 32], &secret())?;
        let b = cipher().encrypt(&[7u8; 32], &secret())?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn wrong_secret_is_bad_secret() -> Result<()> {
        let blob = cipher().encrypt(&[7u8; 32], &secret())?;
        let result = cipher().decrypt(&blob, &VaultSecret::from_passphrase("nope"));
        assert!(matches!(result, Err(KeyportError::BadSecret)));
        Ok(())
    }

    #[test]
    fn flipped_ciphertext_is_corrupt() -> Result<()> {
        let blob = cipher().encrypt(&[7u8; 32], &secret())?;
        let mut bytes = hex::decode(&blob).map_err(|e| corrupt(e.to_string()))?;
        if let Some(last) = bytes.last_mut() {
            *last ^= 0x01;
        }
        let result = cipher().decrypt(&hex::encode(bytes), &secret());
        assert!(matches!(result, Err(KeyportError::CorruptData { .. })));
        Ok(())
    }

    #[test]
    fn wrong_magic_is_corrupt() -> Result<()> {
        let blob = cipher().encrypt(&[7u8; 32], &secret())?;
        let tampered = format!("00000000{}", &blob[8..]);
        let result = cipher().decrypt(&tampered, &secret());
        assert!(matches!(result, Err(KeyportError::CorruptData { .. })));
        Ok(())
    }

    fn with_header_word(blob: &str, offset: usize, value: u32) -> Result<String> {
        let mut bytes = hex::decode(blob).map_err(|e| corrupt(e.to_string()))?;
        bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(hex::encode(bytes))
    }

    #[test]
    fn oversized_header_costs_are_corrupt() -> Result<()> {
        let blob = cipher().encrypt(&[7u8; 32], &secret())?;
        // m_cost, t_cost, p_cost sit at offsets 5, 9 and 13.
        for offset in [5, 9, 13] {
            let tampered = with_header_word(&blob, offset, u32::MAX)?;
            let result = cipher().decrypt(&tampered, &secret());
            assert!(
                matches!(result, Err(KeyportError::CorruptData { .. })),
                "offset {offset}"
            );
        }
        Ok(())
    }

    #[test]
    fn costs_at_the_ceiling_pass_the_range_check() {
        let header = HeaderBody {
            m_cost: MAX_M_COST,
            t_cost: MAX_T_COST,
            p_cost: MAX_P_COST,
            salt: [0; 32],
            nonce: [0; NONCE_LEN],
            key_check: [0; 32],
        };
        assert!(header.check_costs().is_ok());
    }

    #[test]
    fn non_hex_or_short_is_corrupt() {
        assert!(matches!(
            cipher().decrypt("blob1", &secret()),
            Err(KeyportError::CorruptData { .. })
        ));
        assert!(matches!(
            cipher().decrypt("4b505654", &secret()),
            Err(KeyportError::CorruptData { .. })
        ));
    }

    #[test]
    fn blob_opens_under_different_default_params() -> Result<()> {
        let blob = cipher().encrypt(&[9u8; 32], &secret())?;
        let reader = PassphraseCipher::new(Argon2Params {
            m_cost: 512,
            t_cost: 2,
            p_cost: 1,
        });
        assert_eq!(reader.decrypt(&blob, &secret())?.as_slice(), &[9u8; 32]);
        Ok(())
    }
}
