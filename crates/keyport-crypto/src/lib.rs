//! Cryptographic primitives for the keyport migration engine.
//!
//! This crate is the **sole** location for raw cryptographic operations.
//! No other crate in the workspace touches curves, ciphers or KDFs
//! directly.
//!
//! # Modules
//!
//! - [`aead`]: XChaCha20-Poly1305 authenticated encryption/decryption
//! - [`kdf`]: Argon2id passphrase key derivation
//! - [`hkdf`]: HKDF-SHA256 expansion for per-algorithm key derivation
//! - [`hash`]: Keccak-256 and SHA3-256
//! - [`mnemonic`]: seed phrases, entropy policy and BIP39 seed derivation
//! - [`algorithm`]: capability table mapping [`SignAlgo`](keyport_types::SignAlgo) to curve operations
//! - [`key_material`]: algorithm-tagged key pairs derived from one seed

pub mod aead;
pub mod algorithm;
pub mod hash;
pub mod hkdf;
pub mod kdf;
pub mod key_material;
pub mod mnemonic;
