//! Integration tests for keyport-vault.
//!
//! Keys are fixed scalars and the cipher uses cheap Argon2 parameters.
//! Randomness only affects salts and nonces inside blobs, never the
//! assertions.

use std::sync::Arc;

use keyport_crypto::algorithm::{AlgorithmRegistry, Secp256k1Scheme};
use keyport_crypto::kdf::Argon2Params;
use keyport_crypto::key_material::{KeyMaterial, PrivateKey};
use keyport_types::{KeyportError, SignAlgo, Timestamp};
use keyport_vault::cipher::{PassphraseCipher, VaultCipher, VaultSecret};
use keyport_vault::entry::{KeyringState, VaultEntry, VaultEntryV2, VaultVersion};
use keyport_vault::keyring::Keyring;
use keyport_vault::migrator::VaultMigrator;

type TestResult = std::result::Result<(), KeyportError>;

const PASSPHRASE: &str = "correct horse battery staple";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    cipher: Arc<PassphraseCipher>,
    registry: Arc<AlgorithmRegistry>,
    secret: VaultSecret,
}

impl Fixture {
    fn new() -> Self {
        Self {
            cipher: Arc::new(PassphraseCipher::new(Argon2Params::insecure_for_tests())),
            registry: Arc::new(AlgorithmRegistry::standard()),
            secret: VaultSecret::from_passphrase(PASSPHRASE),
        }
    }

    fn migrator(&self) -> VaultMigrator {
        VaultMigrator::new(self.cipher.clone(), self.registry.clone())
    }

    fn material(&self, algo: SignAlgo, byte: u8) -> Result<KeyMaterial, KeyportError> {
        KeyMaterial::from_private_key(&self.registry, algo, PrivateKey::from_bytes([byte; 32]))
    }

    fn legacy_entry(&self, id: &str, algo: SignAlgo, byte: u8) -> Result<VaultEntry, KeyportError> {
        let material = self.material(algo, byte)?;
        Ok(VaultEntryV2::seal_legacy(
            id,
            &self.registry,
            self.cipher.as_ref(),
            &material,
            algo,
            &self.secret,
        )?
        .into())
    }

    fn v2_state(&self, entries: Vec<VaultEntry>) -> Result<KeyringState, KeyportError> {
        KeyringState::new(Timestamp::now(), VaultVersion::V2, entries)
    }
}

// ---------------------------------------------------------------------------
// 1. End-to-end v2 → v3
// ---------------------------------------------------------------------------

#[test]
fn p256_entry_migrates_to_v3() -> TestResult {
    let fx = Fixture::new();
    let expected = fx.material(SignAlgo::P256, 0x41)?;
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::P256, 0x41)?])?;

    let migrated = fx.migrator().migrate(&state, &fx.secret)?;

    assert_eq!(migrated.version(), VaultVersion::V3);
    assert_eq!(migrated.entries().len(), 1);
    let VaultEntry::V3(entry) = &migrated.entries()[0] else {
        panic!("expected a v3 entry");
    };
    assert_eq!(entry.id, "a");
    assert_eq!(entry.sign_algo, SignAlgo::P256);
    assert_eq!(&entry.public_key, expected.public_key(SignAlgo::P256)?);
    assert_ne!(entry.encrypted_data, state.entries()[0].encrypted_data());

    // The re-sealed blob holds the raw 32-byte scalar.
    let raw = fx.cipher.decrypt(&entry.encrypted_data, &fx.secret)?;
    assert_eq!(raw.as_slice(), &[0x41; 32]);

    let json = serde_json::to_value(&migrated)?;
    assert_eq!(json["vaultVersion"], 3);
    assert_eq!(json["vault"][0]["signAlgo"], SignAlgo::P256.code());
    assert_eq!(json["vault"][0]["id"], "a");
    Ok(())
}

#[test]
fn mixed_curves_each_detected() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![
        fx.legacy_entry("p", SignAlgo::P256, 0x11)?,
        fx.legacy_entry("k", SignAlgo::Secp256k1, 0x12)?,
    ])?;
    let migrated = fx.migrator().migrate(&state, &fx.secret)?;

    let algos: Vec<Option<SignAlgo>> = migrated.entries().iter().map(VaultEntry::sign_algo).collect();
    assert_eq!(algos, vec![Some(SignAlgo::P256), Some(SignAlgo::Secp256k1)]);
    let ids: Vec<&str> = migrated.entries().iter().map(VaultEntry::id).collect();
    assert_eq!(ids, vec!["p", "k"]);
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Idempotence
// ---------------------------------------------------------------------------

#[test]
fn migrating_current_keyring_is_noop() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::P256, 0x41)?])?;
    let once = fx.migrator().migrate(&state, &fx.secret)?;
    let twice = fx.migrator().migrate(&once, &fx.secret)?;
    assert_eq!(once, twice);
    assert!(!VaultMigrator::needs_migration(&twice));
    Ok(())
}

#[test]
fn current_keyring_needs_no_secret() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::Secp256k1, 0x41)?])?;
    let migrated = fx.migrator().migrate(&state, &fx.secret)?;
    let again = fx
        .migrator()
        .migrate(&migrated, &VaultSecret::from_passphrase("anything"))?;
    assert_eq!(again, migrated);
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. All or nothing
// ---------------------------------------------------------------------------

#[test]
fn corrupt_entry_fails_whole_keyring() -> TestResult {
    let fx = Fixture::new();
    let good = fx.legacy_entry("bad", SignAlgo::P256, 0x03)?;
    let mut blob = hex::decode(good.encrypted_data()).map_err(|e| KeyportError::CorruptData {
        reason: e.to_string(),
    })?;
    if let Some(last) = blob.last_mut() {
        *last ^= 0x80;
    }
    let corrupt: VaultEntry = VaultEntryV2 {
        id: "bad".into(),
        encrypted_data: hex::encode(blob),
    }
    .into();

    let state = fx.v2_state(vec![
        fx.legacy_entry("one", SignAlgo::P256, 0x01)?,
        fx.legacy_entry("two", SignAlgo::Secp256k1, 0x02)?,
        corrupt,
    ])?;
    let before = state.clone();

    let err = match fx.migrator().migrate(&state, &fx.secret) {
        Ok(_) => panic!("migration with a corrupt entry must fail"),
        Err(e) => e,
    };
    assert_eq!(err.entry_id(), Some("bad"));
    assert!(matches!(
        err,
        KeyportError::VaultEntryFailed { ref source, .. }
            if matches!(**source, KeyportError::CorruptData { .. })
    ));

    // Input untouched: still fully v2.
    assert_eq!(state, before);
    assert!(state
        .entries()
        .iter()
        .all(|e| e.version() == VaultVersion::V2));
    Ok(())
}

#[test]
fn damaged_memory_cost_is_corrupt_entry() -> TestResult {
    let fx = Fixture::new();
    let good = fx.legacy_entry("huge", SignAlgo::P256, 0x04)?;
    let mut blob = hex::decode(good.encrypted_data()).map_err(|e| KeyportError::CorruptData {
        reason: e.to_string(),
    })?;
    blob[5..9].copy_from_slice(&u32::MAX.to_le_bytes());
    let damaged: VaultEntry = VaultEntryV2 {
        id: "huge".into(),
        encrypted_data: hex::encode(blob),
    }
    .into();

    let state = fx.v2_state(vec![fx.legacy_entry("one", SignAlgo::P256, 0x01)?, damaged])?;
    let err = match fx.migrator().migrate(&state, &fx.secret) {
        Ok(_) => panic!("a damaged header must not migrate"),
        Err(e) => e,
    };
    assert_eq!(err.entry_id(), Some("huge"));
    assert!(matches!(
        err,
        KeyportError::VaultEntryFailed { ref source, .. }
            if matches!(**source, KeyportError::CorruptData { .. })
    ));
    Ok(())
}

#[test]
fn wrong_secret_is_bad_secret() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::P256, 0x41)?])?;
    let err = match fx
        .migrator()
        .migrate(&state, &VaultSecret::from_passphrase("wrong"))
    {
        Ok(_) => panic!("wrong secret must not migrate"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        KeyportError::VaultEntryFailed { ref source, .. } if matches!(**source, KeyportError::BadSecret)
    ));
    Ok(())
}

#[test]
fn unregistered_curve_is_unknown_algorithm() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::P256, 0x41)?])?;

    let mut k1_only = AlgorithmRegistry::empty();
    k1_only.register(Box::new(Secp256k1Scheme));
    let migrator = VaultMigrator::new(fx.cipher.clone(), Arc::new(k1_only));

    let err = match migrator.migrate(&state, &fx.secret) {
        Ok(_) => panic!("P-256 key must not migrate without a P-256 scheme"),
        Err(e) => e,
    };
    assert_eq!(err.entry_id(), Some("a"));
    assert!(matches!(
        err,
        KeyportError::VaultEntryFailed { ref source, .. }
            if matches!(**source, KeyportError::UnknownAlgorithm { .. })
    ));
    Ok(())
}

#[test]
fn non_key_plaintext_is_corrupt() -> TestResult {
    let fx = Fixture::new();
    let entry: VaultEntry = VaultEntryV2 {
        id: "junk".into(),
        encrypted_data: fx.cipher.encrypt(b"definitely not DER", &fx.secret)?,
    }
    .into();
    let err = match fx.migrator().migrate(&fx.v2_state(vec![entry])?, &fx.secret) {
        Ok(_) => panic!("junk plaintext must not migrate"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        KeyportError::VaultEntryFailed { ref source, .. }
            if matches!(**source, KeyportError::CorruptData { .. })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Migrated keyring opens a session
// ---------------------------------------------------------------------------

#[test]
fn migrated_keyring_unlocks_and_signs() -> TestResult {
    let fx = Fixture::new();
    let state = fx.v2_state(vec![fx.legacy_entry("a", SignAlgo::Secp256k1, 0x55)?])?;
    let migrated = fx.migrator().migrate(&state, &fx.secret)?;

    let mut keyring = Keyring::open(migrated, fx.cipher.clone(), fx.registry.clone())?;
    keyring.unlock("a", &fx.secret)?;
    let expected = fx.material(SignAlgo::Secp256k1, 0x55)?;
    assert_eq!(keyring.address()?, expected.address(SignAlgo::Secp256k1)?);
    assert_eq!(keyring.sign(b"hello")?.len(), 64);
    Ok(())
}
