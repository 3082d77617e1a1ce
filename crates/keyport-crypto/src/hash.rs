//! Keccak-256 and SHA3-256 hashing.
//!
//! Keccak-256 (the pre-standard SHA3 padding) is what EVM chains use for
//! function selectors and address derivation. SHA3-256 is used for
//! internal domain-separated checks such as the vault key check value.

use sha3::{Digest, Keccak256, Sha3_256};

/// Computes the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Computes the SHA3-256 digest of the concatenation of `parts`.
pub fn sha3_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Returns the 4-byte EVM function selector for a canonical signature
/// such as `"transfer(address,uint256)"`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}
