//! HKDF-SHA256 key expansion.
//!
//! Used to derive one independent private scalar per signature
//! algorithm from a single seed, so every entry of a
//! [`KeyMaterial`](crate::key_material::KeyMaterial) traces back to the
//! same entropy.

use hkdf::Hkdf;
use keyport_types::{KeyportError, Result};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum output length in bytes.
const MAX_OUTPUT_LEN: usize = 64;

/// Variable-length key material derived by HKDF-SHA256. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HkdfOutput {
    bytes: Vec<u8>,
}

impl HkdfOutput {
    /// Returns the derived key material.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the output length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the output is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Derives `output_len` bytes from `ikm` using HKDF-SHA256.
///
/// An empty `salt` selects the RFC 5869 zero-filled salt.
///
/// # Errors
///
/// [`KeyportError::CryptoError`] if `output_len` is 0 or above 64.
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8], output_len: usize) -> Result<HkdfOutput> {
    if output_len == 0 || output_len > MAX_OUTPUT_LEN {
        return Err(KeyportError::CryptoError {
            reason: format!("HKDF output length must be 1..={MAX_OUTPUT_LEN}, got {output_len}"),
        });
    }

    let salt_opt: Option<&[u8]> = if salt.is_empty() { None } else { Some(salt) };
    let hk = Hkdf::<Sha256>::new(salt_opt, ikm);

    let mut okm = vec![0u8; output_len];
    hk.expand(info, &mut okm).map_err(|e| KeyportError::CryptoError {
        reason: format!("HKDF-SHA256 expansion failed: {e}"),
    })?;

    Ok(HkdfOutput { bytes: okm })
}
