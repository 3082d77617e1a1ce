//! Algorithm-tagged key pairs.
//!
//! A [`KeyMaterial`] holds at most one key pair per [`SignAlgo`], and all
//! pairs come from the same source: either one [`Seed`] (every registered
//! algorithm) or one imported private key (a single algorithm). There is
//! no way to merge materials, so pairs from unrelated seeds never mix.
//!
//! Private halves are zeroized on drop. Neither [`PrivateKey`] nor
//! [`KeyMaterial`] implements `Clone` or `Debug`.

use std::collections::BTreeMap;
use std::fmt;

use keyport_types::{EvmAddress, KeyportError, Result, SignAlgo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::algorithm::AlgorithmRegistry;
use crate::hash::keccak256;
use crate::hkdf::hkdf_sha256;
use crate::mnemonic::Seed;

/// HKDF salt for per-algorithm seed expansion.
const SEED_KDF_SALT: &[u8] = b"keyport-seed-v1";

/// Upper bound on HKDF counter retries when a candidate scalar is
/// outside the curve order. The probability of even one retry is
/// below 2^-32 for both supported curves.
const MAX_DERIVE_ATTEMPTS: u32 = 16;

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A 32-byte private scalar. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Byte length of a private scalar.
    pub const LEN: usize = 32;

    /// Wraps raw scalar bytes. Curve validity is checked by the scheme
    /// that uses the key.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Copies a scalar out of a slice.
    ///
    /// # Errors
    ///
    /// [`KeyportError::CryptoError`] if the slice is not exactly
    /// [`PrivateKey::LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| KeyportError::CryptoError {
            reason: format!(
                "private key must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ),
        })?;
        Ok(Self(array))
    }

    /// Returns the raw scalar.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// An uncompressed SEC1 public key point (`0x04 || x || y`).
///
/// Serialized as lowercase hex.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Byte length of an uncompressed SEC1 point.
    pub const LEN: usize = 65;

    /// Leading tag byte of an uncompressed SEC1 point.
    const UNCOMPRESSED_TAG: u8 = 0x04;

    pub(crate) fn from_sec1_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parses a public key from raw SEC1 bytes.
    ///
    /// # Errors
    ///
    /// [`KeyportError::CorruptData`] if the bytes are not an uncompressed
    /// point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN || bytes[0] != Self::UNCOMPRESSED_TAG {
            return Err(KeyportError::CorruptData {
                reason: format!(
                    "public key must be a {}-byte uncompressed SEC1 point",
                    Self::LEN
                ),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Parses a hex-encoded public key, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| KeyportError::CorruptData {
            reason: format!("public key is not valid hex: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Returns the SEC1 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Chain address: the last 20 bytes of Keccak-256 over `x || y`.
    pub fn address(&self) -> EvmAddress {
        let digest = keccak256(&self.0[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);
        EvmAddress::new(address)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// KeyPair / KeyMaterial
// ---------------------------------------------------------------------------

/// One private scalar and its public point.
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Returns the private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Returns the public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// Key pairs for one or more signature algorithms, all from one source.
pub struct KeyMaterial {
    pairs: BTreeMap<SignAlgo, KeyPair>,
}

impl KeyMaterial {
    /// Derives one key pair per registered algorithm from `seed`.
    ///
    /// Each scalar is `HKDF-SHA256(ikm = seed, salt = "keyport-seed-v1",
    /// info = "keyport/<ALGO>/<counter>")`, starting at counter 0 and
    /// retrying with the next counter while the candidate is not a valid
    /// scalar for the curve.
    pub fn from_seed(registry: &AlgorithmRegistry, seed: &Seed) -> Result<Self> {
        let mut pairs = BTreeMap::new();
        for algo in registry.algorithms() {
            let pair = derive_pair(registry, algo, seed)?;
            pairs.insert(algo, pair);
        }
        Ok(Self { pairs })
    }

    /// Builds single-algorithm material from an imported private key.
    ///
    /// # Errors
    ///
    /// [`KeyportError::UnknownAlgorithm`] if `algo` is not registered, or
    /// [`KeyportError::CryptoError`] if the scalar is invalid for it.
    pub fn from_private_key(
        registry: &AlgorithmRegistry,
        algo: SignAlgo,
        private_key: PrivateKey,
    ) -> Result<Self> {
        let public_key = registry.scheme(algo)?.derive_public_key(&private_key)?;
        let mut pairs = BTreeMap::new();
        pairs.insert(
            algo,
            KeyPair {
                private_key,
                public_key,
            },
        );
        Ok(Self { pairs })
    }

    /// Returns the algorithms present, in code order.
    pub fn algorithms(&self) -> impl Iterator<Item = SignAlgo> + '_ {
        self.pairs.keys().copied()
    }

    /// Returns the key pair for `algo`.
    pub fn pair(&self, algo: SignAlgo) -> Result<&KeyPair> {
        self.pairs
            .get(&algo)
            .ok_or_else(|| KeyportError::UnknownAlgorithm {
                reason: format!("key material holds no {algo} key"),
            })
    }

    /// Returns the public key for `algo`.
    pub fn public_key(&self, algo: SignAlgo) -> Result<&PublicKey> {
        Ok(self.pair(algo)?.public_key())
    }

    /// Returns the chain address for `algo`.
    pub fn address(&self, algo: SignAlgo) -> Result<EvmAddress> {
        Ok(self.public_key(algo)?.address())
    }

    /// Signs `message` with the `algo` key.
    pub fn sign(
        &self,
        registry: &AlgorithmRegistry,
        algo: SignAlgo,
        message: &[u8],
    ) -> Result<Vec<u8>> {
        let pair = self.pair(algo)?;
        registry.scheme(algo)?.sign(pair.private_key(), message)
    }
}

// KeyMaterial does not implement Clone/Debug to prevent leakage.

fn derive_pair(registry: &AlgorithmRegistry, algo: SignAlgo, seed: &Seed) -> Result<KeyPair> {
    let scheme = registry.scheme(algo)?;
    for counter in 0..MAX_DERIVE_ATTEMPTS {
        let info = format!("keyport/{algo}/{counter}");
        let okm = hkdf_sha256(seed.as_bytes(), SEED_KDF_SALT, info.as_bytes(), PrivateKey::LEN)?;
        let private_key = PrivateKey::from_slice(okm.as_bytes())?;
        if let Ok(public_key) = scheme.derive_public_key(&private_key) {
            return Ok(KeyPair {
                private_key,
                public_key,
            });
        }
    }
    Err(KeyportError::CryptoError {
        reason: format!("no valid {algo} scalar after {MAX_DERIVE_ATTEMPTS} attempts"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
