//! XChaCha20-Poly1305 authenticated encryption for vault payloads.
//!
//! Every vault payload is sealed with a fresh 192-bit nonce drawn from
//! OS entropy. The nonce travels with the ciphertext in a [`SealedBox`];
//! it is never derived from the key or the plaintext.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use keyport_types::{KeyportError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Byte length of an XChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 24;

/// Byte length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// SealedBox
// ---------------------------------------------------------------------------

/// Nonce plus ciphertext produced by [`seal`].
///
/// `ciphertext` carries the 16-byte Poly1305 tag at its end, so its
/// length is always `plaintext.len() + TAG_LEN`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SealedBox {
    /// Nonce used for this encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted payload with the tag appended.
    pub ciphertext: Vec<u8>,
}

/// Generates a fresh 192-bit random nonce from OS entropy.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

// ---------------------------------------------------------------------------
// Seal / Open
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` under `key` with a freshly generated nonce.
///
/// `aad` is authenticated but not encrypted; pass `&[]` if unused.
pub fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<SealedBox> {
    seal_with_nonce(key, generate_nonce(), plaintext, aad)
}

/// Encrypts `plaintext` under `key` with a caller-supplied nonce.
///
/// The nonce must never repeat for the same key. Exposed for
/// deterministic tests; production code uses [`seal`].
pub fn seal_with_nonce(
    key: &[u8; 32],
    nonce: [u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedBox> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), payload)
        .map_err(|e| KeyportError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })?;

    Ok(SealedBox { nonce, ciphertext })
}

/// Decrypts a [`SealedBox`] under `key`.
///
/// # Errors
///
/// Returns [`KeyportError::CryptoError`] if tag verification fails
/// (wrong key, tampered ciphertext, or mismatched AAD). Callers that
/// need to tell a wrong secret from corruption must check the key
/// before calling this.
pub fn open(key: &[u8; 32], sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: &sealed.ciphertext,
        aad,
    };

    cipher
        .decrypt(XNonce::from_slice(&sealed.nonce), payload)
        .map_err(|e| KeyportError::CryptoError {
            reason: format!("XChaCha20-Poly1305 decryption failed: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
