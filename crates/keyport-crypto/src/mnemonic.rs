//! Seed phrases, entropy strength classification, and BIP39 seed derivation.
//!
//! A [`SeedPhrase`] is session-scoped: it is parsed from user input,
//! classified by [`strength_for`], stretched into a 64-byte [`Seed`]
//! and dropped. Both types zeroize their contents on drop.
//!
//! Reference: <https://github.com/bitcoin/bips/blob/master/bip-0039.mediawiki>

use hmac::Hmac;
use keyport_types::{KeyportError, Result};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Entropy policy
// ---------------------------------------------------------------------------

/// Word counts with a defined entropy strength, paired with that strength
/// in bits.
pub const ENTROPY_TABLE: [(usize, u32); 5] = [(12, 128), (15, 160), (18, 192), (21, 224), (24, 256)];

/// Strength returned for any word count missing from [`ENTROPY_TABLE`].
pub const FALLBACK_STRENGTH_BITS: u32 = 128;

/// Maps a seed phrase word count to its entropy strength in bits.
///
/// Total and pure: 12→128, 15→160, 18→192, 21→224, 24→256, and every
/// other count returns [`FALLBACK_STRENGTH_BITS`].
///
/// The fallback classifies a malformed phrase (say 13 words) as a weak
/// but valid 128-bit phrase instead of rejecting it. Callers that need
/// strict validation should check [`is_standard_word_count`] first.
pub fn strength_for(word_count: usize) -> u32 {
    ENTROPY_TABLE
        .iter()
        .find(|(count, _)| *count == word_count)
        .map(|(_, bits)| *bits)
        .unwrap_or(FALLBACK_STRENGTH_BITS)
}

/// Returns `true` if `word_count` has an explicit entry in [`ENTROPY_TABLE`].
pub fn is_standard_word_count(word_count: usize) -> bool {
    ENTROPY_TABLE.iter().any(|(count, _)| *count == word_count)
}

// ---------------------------------------------------------------------------
// SeedPhrase
// ---------------------------------------------------------------------------

/// An ordered sequence of mnemonic words.
///
/// Whitespace is normalized to single spaces on parse. The phrase is
/// zeroized on drop and never persisted in plaintext.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SeedPhrase(String);

impl SeedPhrase {
    /// Parses a phrase, collapsing runs of whitespace.
    ///
    /// # Errors
    ///
    /// [`KeyportError::CryptoError`] if the phrase contains no words.
    pub fn parse(phrase: &str) -> Result<Self> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(KeyportError::CryptoError {
                reason: "seed phrase is empty".into(),
            });
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized phrase.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number of words.
    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }

    /// Returns the entropy strength in bits, per [`strength_for`].
    pub fn entropy_bits(&self) -> u32 {
        strength_for(self.word_count())
    }

    /// Stretches the phrase into a 64-byte BIP39 seed.
    pub fn to_seed(&self, passphrase: &str) -> Result<Seed> {
        mnemonic_to_seed(&self.0, passphrase)
    }
}

// SeedPhrase does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 64-byte BIP39 seed. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Fixed byte length of a BIP39 seed.
    pub const LEN: usize = 64;

    /// Creates a [`Seed`] from raw bytes (fixtures, stored test vectors).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the raw seed.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Derives a 64-byte seed from a mnemonic sentence.
///
/// PBKDF2-HMAC-SHA512, 2048 rounds, salt = `"mnemonic" || passphrase`.
pub fn mnemonic_to_seed(mnemonic: &str, passphrase: &str) -> Result<Seed> {
    let mut salt = Vec::with_capacity(8 + passphrase.len());
    salt.extend_from_slice(b"mnemonic");
    salt.extend_from_slice(passphrase.as_bytes());

    let mut output = [0u8; 64];
    let result = pbkdf2::pbkdf2::<Hmac<Sha512>>(mnemonic.as_bytes(), &salt, 2048, &mut output)
        .map_err(|e| KeyportError::CryptoError {
            reason: format!("PBKDF2-HMAC-SHA512 failed: {e}"),
        });

    salt.zeroize();
    result?;

    Ok(Seed(output))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
