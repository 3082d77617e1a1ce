//! Capability table mapping signature algorithms to curve operations.
//!
//! Each supported [`SignAlgo`] is backed by a [`CurveScheme`] that knows
//! how to derive a public key, sign, and verify. The algorithm of a key
//! is decided once, when a legacy key is decoded, by looking its
//! named-curve OID up in the [`AlgorithmRegistry`]. From then on the tag
//! is carried explicitly and never re-detected.
//!
//! Legacy (pre-tag) private keys are SEC1 `ECPrivateKey` DER documents
//! with the named-curve parameter set:
//!
//! ```text
//! ECPrivateKey ::= SEQUENCE {
//!   version        INTEGER { ecPrivkeyVer1(1) },
//!   privateKey     OCTET STRING,            -- 32-byte scalar
//!   parameters [0] ECParameters OPTIONAL,   -- namedCurve OID
//!   publicKey  [1] BIT STRING OPTIONAL }
//! ```

use std::collections::BTreeMap;

use keyport_types::{KeyportError, Result, SignAlgo};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sec1::der::asn1::ObjectIdentifier;
use sec1::der::{Decode, Encode};
use sec1::{EcParameters, EcPrivateKey};
use zeroize::Zeroizing;

use crate::key_material::{PrivateKey, PublicKey};

/// Named-curve OID of NIST P-256 (secp256r1).
pub const SECP256R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// Named-curve OID of secp256k1.
pub const SECP256K1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

// ---------------------------------------------------------------------------
// CurveScheme
// ---------------------------------------------------------------------------

/// Operations one signature algorithm provides.
///
/// Public keys are uncompressed SEC1 points (65 bytes). Signatures are
/// fixed-size `r || s` (64 bytes) over SHA-256 of the message.
pub trait CurveScheme: Send + Sync {
    /// The algorithm tag this scheme implements.
    fn algo(&self) -> SignAlgo;

    /// The named-curve OID identifying this scheme in SEC1 documents.
    fn curve_oid(&self) -> ObjectIdentifier;

    /// Derives the public key for a private scalar.
    ///
    /// Fails with [`KeyportError::CryptoError`] if the scalar is zero or
    /// not below the curve order.
    fn derive_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey>;

    /// Signs `message`.
    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>>;

    /// Verifies `signature` over `message` under `public_key`.
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<()>;
}

fn invalid_scalar(algo: SignAlgo) -> KeyportError {
    KeyportError::CryptoError {
        reason: format!("private key is not a valid {algo} scalar"),
    }
}

fn invalid_signature(algo: SignAlgo, e: impl std::fmt::Display) -> KeyportError {
    KeyportError::CryptoError {
        reason: format!("{algo} signature verification failed: {e}"),
    }
}

// ---------------------------------------------------------------------------
// P-256
// ---------------------------------------------------------------------------

/// ECDSA over NIST P-256.
pub struct P256Scheme;

impl CurveScheme for P256Scheme {
    fn algo(&self) -> SignAlgo {
        SignAlgo::P256
    }

    fn curve_oid(&self) -> ObjectIdentifier {
        SECP256R1_OID
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey> {
        let secret = p256::SecretKey::from_slice(private_key.as_bytes())
            .map_err(|_| invalid_scalar(SignAlgo::P256))?;
        let point = secret.public_key().to_encoded_point(false);
        Ok(PublicKey::from_sec1_bytes(point.as_bytes().to_vec()))
    }

    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>> {
        use p256::ecdsa::signature::Signer;

        let signing_key = p256::ecdsa::SigningKey::from_slice(private_key.as_bytes())
            .map_err(|_| invalid_scalar(SignAlgo::P256))?;
        let signature: p256::ecdsa::Signature = signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
        use p256::ecdsa::signature::Verifier;

        let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
            .map_err(|e| invalid_signature(SignAlgo::P256, e))?;
        let signature = p256::ecdsa::Signature::from_slice(signature)
            .map_err(|e| invalid_signature(SignAlgo::P256, e))?;
        verifying_key
            .verify(message, &signature)
            .map_err(|e| invalid_signature(SignAlgo::P256, e))
    }
}

// ---------------------------------------------------------------------------
// secp256k1
// ---------------------------------------------------------------------------

/// ECDSA over secp256k1.
pub struct Secp256k1Scheme;

impl CurveScheme for Secp256k1Scheme {
    fn algo(&self) -> SignAlgo {
        SignAlgo::Secp256k1
    }

    fn curve_oid(&self) -> ObjectIdentifier {
        SECP256K1_OID
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey> {
        let secret = k256::SecretKey::from_slice(private_key.as_bytes())
            .map_err(|_| invalid_scalar(SignAlgo::Secp256k1))?;
        let point = secret.public_key().to_encoded_point(false);
        Ok(PublicKey::from_sec1_bytes(point.as_bytes().to_vec()))
    }

    fn sign(&self, private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>> {
        use k256::ecdsa::signature::Signer;

        let signing_key = k256::ecdsa::SigningKey::from_slice(private_key.as_bytes())
            .map_err(|_| invalid_scalar(SignAlgo::Secp256k1))?;
        let signature: k256::ecdsa::Signature = signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
        use k256::ecdsa::signature::Verifier;

        let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
            .map_err(|e| invalid_signature(SignAlgo::Secp256k1, e))?;
        let signature = k256::ecdsa::Signature::from_slice(signature)
            .map_err(|e| invalid_signature(SignAlgo::Secp256k1, e))?;
        verifying_key
            .verify(message, &signature)
            .map_err(|e| invalid_signature(SignAlgo::Secp256k1, e))
    }
}

// ---------------------------------------------------------------------------
// AlgorithmRegistry
// ---------------------------------------------------------------------------

/// Lookup table from [`SignAlgo`] to its [`CurveScheme`].
///
/// Adding an algorithm means adding a `SignAlgo` variant and
/// registering one scheme here; nothing else branches on curves.
pub struct AlgorithmRegistry {
    schemes: BTreeMap<SignAlgo, Box<dyn CurveScheme>>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            schemes: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in scheme (P-256, secp256k1).
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(P256Scheme));
        registry.register(Box::new(Secp256k1Scheme));
        registry
    }

    /// Registers (or replaces) the scheme for its algorithm.
    pub fn register(&mut self, scheme: Box<dyn CurveScheme>) {
        self.schemes.insert(scheme.algo(), scheme);
    }

    /// Returns the scheme for `algo`.
    ///
    /// # Errors
    ///
    /// [`KeyportError::UnknownAlgorithm`] if nothing is registered for it.
    pub fn scheme(&self, algo: SignAlgo) -> Result<&dyn CurveScheme> {
        self.schemes
            .get(&algo)
            .map(|s| s.as_ref())
            .ok_or_else(|| KeyportError::UnknownAlgorithm {
                reason: format!("no scheme registered for {algo}"),
            })
    }

    /// Returns the registered algorithms in code order.
    pub fn algorithms(&self) -> impl Iterator<Item = SignAlgo> + '_ {
        self.schemes.keys().copied()
    }

    /// Finds the algorithm whose curve has the given OID.
    pub fn algo_for_oid(&self, oid: &ObjectIdentifier) -> Result<SignAlgo> {
        self.schemes
            .values()
            .find(|s| &s.curve_oid() == oid)
            .map(|s| s.algo())
            .ok_or_else(|| KeyportError::UnknownAlgorithm {
                reason: format!("unrecognized curve OID {oid}"),
            })
    }

    /// Decodes a legacy SEC1 private key and identifies its algorithm.
    ///
    /// The scalar is validated against the detected curve before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`KeyportError::CorruptData`] if the bytes are not a SEC1
    ///   document or the scalar has the wrong length or range.
    /// - [`KeyportError::UnknownAlgorithm`] if the curve parameter is
    ///   missing or its OID is not registered.
    pub fn decode_legacy_key(&self, der: &[u8]) -> Result<(SignAlgo, PrivateKey)> {
        let parsed = EcPrivateKey::from_der(der).map_err(|e| KeyportError::CorruptData {
            reason: format!("legacy key is not a SEC1 document: {e}"),
        })?;

        let oid = parsed
            .parameters
            .and_then(|params| params.named_curve())
            .ok_or_else(|| KeyportError::UnknownAlgorithm {
                reason: "legacy key does not name its curve".into(),
            })?;
        let algo = self.algo_for_oid(&oid)?;

        let private_key =
            PrivateKey::from_slice(parsed.private_key).map_err(|_| KeyportError::CorruptData {
                reason: format!(
                    "legacy {algo} key has {} scalar bytes, expected {}",
                    parsed.private_key.len(),
                    PrivateKey::LEN
                ),
            })?;

        self.scheme(algo)?
            .derive_public_key(&private_key)
            .map_err(|_| KeyportError::CorruptData {
                reason: format!("legacy key scalar is out of range for {algo}"),
            })?;

        Ok((algo, private_key))
    }

    /// Encodes a private key as a legacy SEC1 document naming its curve.
    ///
    /// The returned buffer holds key material and is zeroized on drop.
    pub fn encode_legacy_key(
        &self,
        algo: SignAlgo,
        private_key: &PrivateKey,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let scheme = self.scheme(algo)?;
        let public_key = scheme.derive_public_key(private_key)?;
        let document = EcPrivateKey {
            private_key: private_key.as_bytes(),
            parameters: Some(EcParameters::NamedCurve(scheme.curve_oid())),
            public_key: Some(public_key.as_bytes()),
        };
        let der = document.to_der().map_err(|e| KeyportError::CryptoError {
            reason: format!("failed to encode SEC1 key: {e}"),
        })?;
        Ok(Zeroizing::new(der))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
