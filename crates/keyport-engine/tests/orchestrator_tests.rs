//! Integration tests for the migration orchestrator.
//!
//! Every collaborator is in-process: a [`MemoryStore`], the passphrase
//! cipher with cheap Argon2 parameters, a static or gated inventory and
//! scripted submitters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use keyport_assets::batch::TransactionDatas;
use keyport_assets::inventory::{AssetInventory, Erc20Asset, MigrationAssetsData, StaticInventory};
use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_crypto::kdf::Argon2Params;
use keyport_crypto::key_material::{KeyMaterial, PrivateKey};
use keyport_engine::orchestrator::{MigrationOrchestrator, MigrationReport, MigrationRequest};
use keyport_engine::state::{FailureStage, MigrationState};
use keyport_engine::submit::{CallOutcome, ChainSubmitter, SubmissionReceipt};
use keyport_storage::keyring_store::KeyringStore;
use keyport_storage::kv::{KeyValueStore, MemoryStore};
use keyport_storage::profile::CurrentProfileResolver;
use keyport_types::config::MigrationConfig;
use keyport_types::{EvmAddress, KeyportError, ProfileId, Result, SignAlgo, Timestamp};
use keyport_vault::cipher::{PassphraseCipher, VaultCipher, VaultSecret};
use keyport_vault::entry::{KeyringState, VaultEntry, VaultEntryV2, VaultEntryV3, VaultVersion};
use tokio::sync::{watch, Notify};

type TestResult = std::result::Result<(), KeyportError>;

const PASSPHRASE: &str = "correct horse battery staple";
const DESTINATION: EvmAddress = EvmAddress::new([0xd5; 20]);
const TOKEN: EvmAddress = EvmAddress::new([0x20; 20]);

// ---------------------------------------------------------------------------
// Submitters
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingSubmitter {
    /// Number of leading calls to `submit` that fail with a transport error.
    transport_failures: usize,
    /// Index of a call reported as reverted.
    revert_at: Option<usize>,
    /// Delay before answering.
    delay: Option<Duration>,
    seen: Mutex<Vec<TransactionDatas>>,
    calls: AtomicUsize,
}

impl RecordingSubmitter {
    fn seen(&self) -> Vec<TransactionDatas> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainSubmitter for RecordingSubmitter {
    async fn submit(&self, batch: &TransactionDatas) -> Result<SubmissionReceipt> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if attempt < self.transport_failures {
            return Err(KeyportError::SubmissionFailed {
                retryable: true,
                reason: "node unreachable".into(),
            });
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(batch.clone());
        }
        let outcomes = (0..batch.len())
            .map(|i| {
                if Some(i) == self.revert_at {
                    CallOutcome::Failed {
                        reason: "execution reverted".into(),
                    }
                } else {
                    CallOutcome::Succeeded
                }
            })
            .collect();
        Ok(SubmissionReceipt {
            tx_id: format!("0xtx{attempt}"),
            outcomes,
        })
    }
}

// ---------------------------------------------------------------------------
// Gated inventory
// ---------------------------------------------------------------------------

/// Parks every snapshot until released, so a run can be held mid-flight.
struct GatedInventory {
    assets: MigrationAssetsData,
    entered: Notify,
    release: Notify,
}

impl GatedInventory {
    fn new(assets: MigrationAssetsData) -> Self {
        Self {
            assets,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl AssetInventory for GatedInventory {
    async fn snapshot(&self, _owner: EvmAddress) -> Result<MigrationAssetsData> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.assets.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture {
    store: Arc<MemoryStore>,
    cipher: Arc<PassphraseCipher>,
    registry: AlgorithmRegistry,
    config: MigrationConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            cipher: Arc::new(PassphraseCipher::new(Argon2Params::insecure_for_tests())),
            registry: AlgorithmRegistry::standard(),
            config: MigrationConfig::default(),
        }
    }

    fn secret() -> VaultSecret {
        VaultSecret::from_passphrase(PASSPHRASE)
    }

    fn profile(id: &str) -> Result<ProfileId> {
        ProfileId::new(id)
    }

    fn material(&self, algo: SignAlgo, byte: u8) -> Result<KeyMaterial> {
        KeyMaterial::from_private_key(&self.registry, algo, PrivateKey::from_bytes([byte; 32]))
    }

    fn legacy_entry(&self, id: &str, algo: SignAlgo, byte: u8) -> Result<VaultEntry> {
        let material = self.material(algo, byte)?;
        Ok(VaultEntryV2::seal_legacy(
            id,
            &self.registry,
            self.cipher.as_ref(),
            &material,
            algo,
            &Self::secret(),
        )?
        .into())
    }

    fn keyrings(&self) -> KeyringStore {
        KeyringStore::new(self.store.clone(), self.config.keyring_key_prefix.clone())
    }

    fn raw_keyring(&self, profile: &ProfileId) -> Result<Option<String>> {
        self.store
            .get(&format!("{}{profile}", self.config.keyring_key_prefix))
    }

    /// Stores a v2 keyring with a P-256 entry "a" and a secp256k1 entry "b".
    fn seed_v2(&self, profile: &ProfileId) -> Result<KeyringState> {
        let state = KeyringState::new(
            Timestamp::now(),
            VaultVersion::V2,
            vec![
                self.legacy_entry("a", SignAlgo::P256, 0x41)?,
                self.legacy_entry("b", SignAlgo::Secp256k1, 0x42)?,
            ],
        )?;
        self.keyrings().save(profile, &state)?;
        Ok(state)
    }

    fn set_current(&self, profile: &ProfileId) -> Result<()> {
        CurrentProfileResolver::new(self.store.clone(), self.config.current_profile_key.clone())
            .set_current_profile_id(profile)
    }

    fn orchestrator(
        &self,
        inventory: Arc<dyn AssetInventory>,
        submitter: Arc<dyn ChainSubmitter>,
    ) -> Result<MigrationOrchestrator> {
        MigrationOrchestrator::new(
            self.config.clone(),
            self.store.clone(),
            self.cipher.clone(),
            inventory,
            submitter,
        )
    }
}

fn one_token() -> MigrationAssetsData {
    let mut assets = MigrationAssetsData::default();
    assets.erc20.insert(Erc20Asset {
        contract_address: TOKEN,
        amount: U256::from(1_000u64),
    });
    assets.native = Some(U256::from(5u64));
    assets
}

fn states(report: &MigrationReport) -> Vec<MigrationState> {
    report.events.iter().map(|e| e.to.clone()).collect()
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn v2_profile_migrates_and_submits() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    fx.set_current(&alice)?;
    let submitter = Arc::new(RecordingSubmitter::default());
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter.clone())?;

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()))
        .await;

    assert!(report.is_completed(), "{:?}", report.error());
    assert_eq!(report.profile_id.as_ref(), Some(&alice));
    assert_eq!(
        states(&report),
        vec![
            MigrationState::ResolvingProfile,
            MigrationState::MigratingVault,
            MigrationState::PlanningAssets,
            MigrationState::SubmittingBatch,
            MigrationState::Completed,
        ]
    );

    let vault = report.vault.expect("vault stage ran");
    assert_eq!(vault.from, VaultVersion::V2);
    assert_eq!(vault.to, VaultVersion::V3);
    assert_eq!(vault.entries, 2);
    assert!(vault.persisted);

    let stored = fx.keyrings().load(&alice)?;
    assert_eq!(stored.version(), VaultVersion::V3);
    assert_eq!(stored.entry("a").and_then(VaultEntry::sign_algo), Some(SignAlgo::P256));
    assert_eq!(
        stored.entry("b").and_then(VaultEntry::sign_algo),
        Some(SignAlgo::Secp256k1)
    );

    // Source defaults to the first entry.
    let expected_source = fx.material(SignAlgo::P256, 0x41)?.address(SignAlgo::P256)?;
    assert_eq!(report.source, Some(expected_source));

    let seen = submitter.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 2);
    assert_eq!(report.batch.as_ref().map(TransactionDatas::digest), Some(seen[0].digest()));
    assert_eq!(report.receipt.map(|r| r.tx_id), Some("0xtx0".to_string()));
    Ok(())
}

#[tokio::test]
async fn named_source_entry_is_used() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;

    let report = orchestrator
        .run(
            MigrationRequest::new(DESTINATION, Fixture::secret())
                .with_profile(alice)
                .with_source_entry("b"),
        )
        .await;

    assert!(report.is_completed(), "{:?}", report.error());
    let expected = fx.material(SignAlgo::Secp256k1, 0x42)?.address(SignAlgo::Secp256k1)?;
    assert_eq!(report.source, Some(expected));
    Ok(())
}

#[tokio::test]
async fn current_keyring_is_not_rewritten() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    let material = fx.material(SignAlgo::Secp256k1, 0x07)?;
    let entry = VaultEntryV3::seal(
        "only",
        fx.cipher.as_ref(),
        &material,
        SignAlgo::Secp256k1,
        &Fixture::secret(),
    )?;
    let state = KeyringState::new(Timestamp::now(), VaultVersion::V3, vec![entry.into()])?;
    fx.keyrings().save(&alice, &state)?;
    let before = fx.raw_keyring(&alice)?;

    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;
    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, VaultSecret::from_passphrase("unused")).with_profile(alice.clone()))
        .await;

    assert!(report.is_completed(), "{:?}", report.error());
    assert_eq!(report.vault.map(|v| v.persisted), Some(false));
    assert_eq!(fx.raw_keyring(&alice)?, before);
    Ok(())
}

#[tokio::test]
async fn empty_holdings_complete_without_submission() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let submitter = Arc::new(RecordingSubmitter::default());
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(MigrationAssetsData::default())),
        submitter.clone(),
    )?;

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice))
        .await;

    assert!(report.is_completed());
    assert!(report.receipt.is_none());
    assert_eq!(report.batch.map(|b| b.len()), Some(0));
    assert_eq!(submitter.calls(), 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Vault failures leave storage untouched
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupt_entry_fails_vault_stage_and_keeps_v2() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    let garbage = fx.cipher.encrypt(b"not a key document", &Fixture::secret())?;
    let state = KeyringState::new(
        Timestamp::now(),
        VaultVersion::V2,
        vec![
            fx.legacy_entry("one", SignAlgo::P256, 0x11)?,
            fx.legacy_entry("two", SignAlgo::Secp256k1, 0x12)?,
            VaultEntryV2 {
                id: "bad".into(),
                encrypted_data: garbage,
            }
            .into(),
        ],
    )?;
    fx.keyrings().save(&alice, &state)?;
    let before = fx.raw_keyring(&alice)?;

    let submitter = Arc::new(RecordingSubmitter::default());
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter.clone())?;
    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice.clone()))
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Vault));
    assert_eq!(report.error().and_then(KeyportError::entry_id), Some("bad"));
    assert!(!report.is_retryable());
    assert_eq!(fx.raw_keyring(&alice)?, before);
    assert_eq!(fx.keyrings().load(&alice)?.version(), VaultVersion::V2);
    assert_eq!(submitter.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_secret_is_bad_secret_at_vault_stage() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let before = fx.raw_keyring(&alice)?;
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;

    let report = orchestrator
        .run(
            MigrationRequest::new(DESTINATION, VaultSecret::from_passphrase("wrong"))
                .with_profile(alice.clone()),
        )
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Vault));
    match report.error() {
        Some(KeyportError::VaultEntryFailed { entry_id, source }) => {
            assert_eq!(entry_id, "a");
            assert!(matches!(**source, KeyportError::BadSecret));
        }
        other => panic!("expected VaultEntryFailed, got {other:?}"),
    }
    assert_eq!(fx.raw_keyring(&alice)?, before);
    Ok(())
}

#[tokio::test]
async fn missing_keyring_fails_vault_stage() -> TestResult {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;
    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(Fixture::profile("ghost")?))
        .await;
    assert_eq!(report.failed_stage(), Some(FailureStage::Vault));
    assert!(matches!(report.error(), Some(KeyportError::KeyringNotFound { .. })));
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Profile and asset failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_current_profile_fails_profile_stage() -> TestResult {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()))
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Profile));
    assert!(matches!(report.error(), Some(KeyportError::NoCurrentProfile)));
    assert!(report.profile_id.is_none());
    assert_eq!(report.events.len(), 2);
    assert!(report.final_state().is_some_and(MigrationState::is_terminal));
    Ok(())
}

#[tokio::test]
async fn destination_equal_to_source_fails_assets_but_keeps_vault() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let source = fx.material(SignAlgo::P256, 0x41)?.address(SignAlgo::P256)?;
    let submitter = Arc::new(RecordingSubmitter::default());
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter.clone())?;

    let report = orchestrator
        .run(MigrationRequest::new(source, Fixture::secret()).with_profile(alice.clone()))
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Assets));
    assert!(matches!(report.error(), Some(KeyportError::InvalidDestination { .. })));
    // The vault migration stands on its own.
    assert_eq!(fx.keyrings().load(&alice)?.version(), VaultVersion::V3);
    assert_eq!(submitter.calls(), 0);
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reverted_call_is_final() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let submitter = Arc::new(RecordingSubmitter {
        revert_at: Some(1),
        ..RecordingSubmitter::default()
    });
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter)?;

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice))
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Submission));
    assert!(matches!(
        report.error(),
        Some(KeyportError::SubmissionFailed { retryable: false, .. })
    ));
    assert!(!report.is_retryable());
    Ok(())
}

#[tokio::test]
async fn submission_timeout_is_retryable() -> TestResult {
    let mut fx = Fixture::new();
    fx.config.submission_timeout_secs = 1;
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let submitter = Arc::new(RecordingSubmitter {
        delay: Some(Duration::from_secs(10)),
        ..RecordingSubmitter::default()
    });
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter)?;

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice.clone()))
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Submission));
    assert!(report.is_retryable());
    assert!(report.batch.is_some());
    assert_eq!(fx.keyrings().load(&alice)?.version(), VaultVersion::V3);
    Ok(())
}

#[tokio::test]
async fn transport_failure_then_resubmit_same_batch() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let submitter = Arc::new(RecordingSubmitter {
        transport_failures: 1,
        ..RecordingSubmitter::default()
    });
    let orchestrator = fx.orchestrator(Arc::new(StaticInventory::new(one_token())), submitter.clone())?;

    let first = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice.clone()))
        .await;
    assert!(first.is_retryable());
    let batch = first.batch.clone().expect("batch was planned");

    let retry = orchestrator.resubmit(alice, batch.clone()).await;

    assert!(retry.is_completed(), "{:?}", retry.error());
    assert_eq!(
        states(&retry),
        vec![MigrationState::SubmittingBatch, MigrationState::Completed]
    );
    assert_eq!(submitter.calls(), 2);
    let seen = submitter.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].digest(), batch.digest());
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. Concurrency and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_runs_for_one_profile_are_rejected() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let inventory = Arc::new(GatedInventory::new(one_token()));
    let orchestrator = Arc::new(fx.orchestrator(inventory.clone(), Arc::new(RecordingSubmitter::default()))?);

    let first = {
        let orchestrator = orchestrator.clone();
        let alice = alice.clone();
        tokio::spawn(async move {
            orchestrator
                .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice))
                .await
        })
    };
    inventory.entered.notified().await;
    assert!(orchestrator.in_flight().is_active(&alice));

    let second = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice.clone()))
        .await;
    assert_eq!(second.failed_stage(), Some(FailureStage::Profile));
    assert!(matches!(
        second.error(),
        Some(KeyportError::MigrationInProgress { .. })
    ));

    inventory.release.notify_one();
    let first = first.await.expect("run task panicked");
    assert!(first.is_completed(), "{:?}", first.error());
    assert!(!orchestrator.in_flight().is_active(&alice));
    Ok(())
}

#[tokio::test]
async fn distinct_profiles_run_side_by_side() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    let bob = Fixture::profile("bob")?;
    fx.seed_v2(&alice)?;
    fx.seed_v2(&bob)?;
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;

    let (a, b) = tokio::join!(
        orchestrator.run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice)),
        orchestrator.run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(bob)),
    );

    assert!(a.is_completed(), "{:?}", a.error());
    assert!(b.is_completed(), "{:?}", b.error());
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let before = fx.raw_keyring(&alice)?;
    let orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;
    let (_tx, rx) = watch::channel(true);

    let report = orchestrator
        .run(
            MigrationRequest::new(DESTINATION, Fixture::secret())
                .with_profile(alice.clone())
                .with_cancel(rx),
        )
        .await;

    assert_eq!(report.failed_stage(), Some(FailureStage::Profile));
    assert!(matches!(report.error(), Some(KeyportError::Cancelled { .. })));
    assert_eq!(fx.raw_keyring(&alice)?, before);
    Ok(())
}

#[tokio::test]
async fn cancel_during_planning_stops_before_submission() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let inventory = Arc::new(GatedInventory::new(one_token()));
    let submitter = Arc::new(RecordingSubmitter::default());
    let orchestrator = Arc::new(fx.orchestrator(inventory.clone(), submitter.clone())?);
    let (tx, rx) = watch::channel(false);

    let run = {
        let orchestrator = orchestrator.clone();
        let alice = alice.clone();
        tokio::spawn(async move {
            orchestrator
                .run(
                    MigrationRequest::new(DESTINATION, Fixture::secret())
                        .with_profile(alice)
                        .with_cancel(rx),
                )
                .await
        })
    };
    inventory.entered.notified().await;
    tx.send_replace(true);
    inventory.release.notify_one();

    let report = run.await.expect("run task panicked");
    assert_eq!(report.failed_stage(), Some(FailureStage::Assets));
    assert!(matches!(report.error(), Some(KeyportError::Cancelled { .. })));
    assert_eq!(submitter.calls(), 0);
    assert_eq!(fx.keyrings().load(&alice)?.version(), VaultVersion::V3);
    Ok(())
}

// ---------------------------------------------------------------------------
// 6. Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_transition_is_published() -> TestResult {
    let fx = Fixture::new();
    let alice = Fixture::profile("alice")?;
    fx.seed_v2(&alice)?;
    let mut orchestrator = fx.orchestrator(
        Arc::new(StaticInventory::new(one_token())),
        Arc::new(RecordingSubmitter::default()),
    )?;
    let mut rx = orchestrator.subscribe();

    let report = orchestrator
        .run(MigrationRequest::new(DESTINATION, Fixture::secret()).with_profile(alice.clone()))
        .await;

    let mut published = Vec::new();
    while let Ok(event) = rx.try_recv() {
        published.push(event);
    }
    assert_eq!(published, report.events);
    assert_eq!(published.first().map(|e| &e.from), Some(&MigrationState::Idle));
    for pair in published.windows(2) {
        assert_eq!(pair[0].to, pair[1].from);
    }
    assert!(published
        .iter()
        .all(|e| e.profile_id.as_ref() == Some(&alice)));
    Ok(())
}
