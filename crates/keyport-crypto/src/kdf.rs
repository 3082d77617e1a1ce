//! Argon2id key derivation for vault passphrases.
//!
//! Derives a 256-bit encryption key from the user's vault secret and a
//! per-blob random salt. Cost parameters travel in each blob header, so
//! blobs written with older parameters stay readable after the defaults
//! change.

use keyport_types::{KeyportError, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum acceptable salt length (the argon2 crate enforces ≥ 8).
const MIN_SALT_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Argon2Params
// ---------------------------------------------------------------------------

/// Tunable Argon2id parameters.
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 65 536  | Memory usage in KiB (64 MiB) |
/// | `t_cost`  | 3       | Number of passes |
/// | `p_cost`  | 1       | Degree of parallelism |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB. Must be ≥ 8 × `p_cost`.
    pub m_cost: u32,
    /// Time cost. Must be ≥ 1.
    pub t_cost: u32,
    /// Parallelism. Must be ≥ 1.
    pub p_cost: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl Argon2Params {
    /// Cheap parameters for tests and fixtures. Never use for real vaults.
    pub fn insecure_for_tests() -> Self {
        Self {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit key derived by Argon2id. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// DerivedKey does not implement Clone/Debug to prevent leakage.

/// Derives a 256-bit key from `password` and `salt` using Argon2id.
///
/// # Errors
///
/// - [`KeyportError::ConfigError`] if the salt is too short or the
///   parameters are rejected by the argon2 crate.
/// - [`KeyportError::CryptoError`] if the hash computation fails.
pub fn argon2id_derive_key(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(KeyportError::ConfigError {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DerivedKey::LEN),
    )
    .map_err(|e| KeyportError::ConfigError {
        reason: format!("invalid Argon2 parameters: {e}"),
    })?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| KeyportError::CryptoError {
            reason: format!("Argon2id derivation failed: {e}"),
        })?;

    Ok(DerivedKey(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() -> Result<()> {
        let params = Argon2Params::insecure_for_tests();
        let a = argon2id_derive_key(b"vault secret", b"0123456789abcdef", &params)?;
        let b = argon2id_derive_key(b"vault secret", b"0123456789abcdef", &params)?;
        assert_eq!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_salt_different_key() -> Result<()> {
        let params = Argon2Params::insecure_for_tests();
        let a = argon2id_derive_key(b"pw", b"salt_aaaaaaa_aaa", &params)?;
        let b = argon2id_derive_key(b"pw", b"salt_bbbbbbb_bbb", &params)?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn salt_too_short_rejected() {
        let result = argon2id_derive_key(b"pw", b"short", &Argon2Params::insecure_for_tests());
        assert!(matches!(result, Err(KeyportError::ConfigError { .. })));
    }

    #[test]
    fn zero_t_cost_rejected() {
        let params = Argon2Params {
            t_cost: 0,
            ..Argon2Params::insecure_for_tests()
        };
        assert!(argon2id_derive_key(b"pw", b"0123456789abcdef", &params).is_err());
    }
}
