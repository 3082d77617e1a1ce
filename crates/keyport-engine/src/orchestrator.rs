//! The migration orchestrator.
//!
//! [`MigrationOrchestrator::run`] takes one [`MigrationRequest`] through
//! profile resolution, vault migration, asset planning and batch
//! submission, and always returns a [`MigrationReport`]. Failures never
//! escape as `Err`; they end the run in `Failed(stage, reason)` and are
//! carried in the report with the original [`KeyportError`].
//!
//! # Guarantees
//!
//! - A failure before `SubmittingBatch` leaves the stored keyring in
//!   exactly one version. The migrated keyring is persisted with one
//!   store write, and only after every entry migrated.
//! - A vault migration, once persisted, is never rolled back by a later
//!   asset or submission failure.
//! - A submission failure leaves the planned batch in the report so it
//!   can be handed to [`MigrationOrchestrator::resubmit`] unchanged.

use std::sync::Arc;

use keyport_assets::batch::TransactionDatas;
use keyport_assets::inventory::AssetInventory;
use keyport_assets::planner::AssetMigrationPlanner;
use keyport_crypto::algorithm::AlgorithmRegistry;
use keyport_storage::keyring_store::KeyringStore;
use keyport_storage::kv::KeyValueStore;
use keyport_storage::profile::CurrentProfileResolver;
use keyport_types::config::MigrationConfig;
use keyport_types::{EvmAddress, KeyportError, ProfileId, Result};
use keyport_vault::cipher::{VaultCipher, VaultSecret};
use keyport_vault::entry::{KeyringState, VaultVersion};
use keyport_vault::migrator::VaultMigrator;
use tokio::sync::{mpsc, watch};

use crate::inflight::{InFlightGuard, InFlightRegistry};
use crate::state::{FailureStage, MigrationEvent, MigrationState};
use crate::submit::{ChainSubmitter, SubmissionReceipt};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Input of one migration run.
///
/// MigrationRequest does not implement Clone/Debug to prevent leakage
/// of the vault secret.
pub struct MigrationRequest {
    /// Profile to migrate. `None` reads the current-profile pointer.
    pub profile_id: Option<ProfileId>,
    /// Address receiving the assets.
    pub destination: EvmAddress,
    /// Secret opening the profile's vault entries.
    pub secret: VaultSecret,
    /// Vault entry whose address is the asset source. `None` uses the
    /// first entry of the migrated keyring.
    pub source_entry_id: Option<String>,
    /// Cancellation signal. Setting it to `true` stops the run at the
    /// next stage boundary before submission.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl MigrationRequest {
    /// Creates a request for the current profile.
    pub fn new(destination: EvmAddress, secret: VaultSecret) -> Self {
        Self {
            profile_id: None,
            destination,
            secret,
            source_entry_id: None,
            cancel: None,
        }
    }

    /// Targets `profile_id` instead of the current profile.
    pub fn with_profile(mut self, profile_id: ProfileId) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    /// Uses the address of vault entry `entry_id` as the asset source.
    pub fn with_source_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.source_entry_id = Some(entry_id.into());
        self
    }

    /// Attaches a cancellation signal.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What the vault stage did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VaultOutcome {
    /// Version loaded from storage.
    pub from: VaultVersion,
    /// Version after migration.
    pub to: VaultVersion,
    /// Number of entries in the keyring.
    pub entries: usize,
    /// Whether a new keyring was written back.
    pub persisted: bool,
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// Every stage succeeded.
    Completed,
    /// The run stopped at `stage`.
    Failed {
        /// Stage that failed.
        stage: FailureStage,
        /// The error, unchanged.
        error: KeyportError,
    },
}

/// Everything a run produced, including on failure.
#[derive(Debug)]
pub struct MigrationReport {
    /// Resolved profile, if resolution got that far.
    pub profile_id: Option<ProfileId>,
    /// Every transition, in order.
    pub events: Vec<MigrationEvent>,
    /// Vault stage result.
    pub vault: Option<VaultOutcome>,
    /// Asset source address.
    pub source: Option<EvmAddress>,
    /// Asset destination address.
    pub destination: Option<EvmAddress>,
    /// Planned batch. Present on submission failure for resubmission.
    pub batch: Option<TransactionDatas>,
    /// Receipt of an accepted batch. `None` for an empty batch.
    pub receipt: Option<SubmissionReceipt>,
    /// How the run ended.
    pub outcome: MigrationOutcome,
}

impl MigrationReport {
    /// Returns `true` if the run completed.
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, MigrationOutcome::Completed)
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&KeyportError> {
        match &self.outcome {
            MigrationOutcome::Completed => None,
            MigrationOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// The failing stage, if any.
    pub fn failed_stage(&self) -> Option<FailureStage> {
        match &self.outcome {
            MigrationOutcome::Completed => None,
            MigrationOutcome::Failed { stage, .. } => Some(*stage),
        }
    }

    /// Returns `true` if resubmitting [`batch`](Self::batch) may succeed.
    pub fn is_retryable(&self) -> bool {
        self.error().is_some_and(KeyportError::is_retryable)
    }

    /// The state the run ended in.
    pub fn final_state(&self) -> Option<&MigrationState> {
        self.events.last().map(|e| &e.to)
    }
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

/// Mutable record of one run. Holds the in-flight claim until dropped.
struct Run {
    state: MigrationState,
    profile_id: Option<ProfileId>,
    events: Vec<MigrationEvent>,
    sender: Option<mpsc::Sender<MigrationEvent>>,
    guard: Option<InFlightGuard>,
    vault: Option<VaultOutcome>,
    source: Option<EvmAddress>,
    destination: Option<EvmAddress>,
    batch: Option<TransactionDatas>,
    receipt: Option<SubmissionReceipt>,
}

impl Run {
    fn new(sender: Option<mpsc::Sender<MigrationEvent>>) -> Self {
        Self {
            state: MigrationState::Idle,
            profile_id: None,
            events: Vec::new(),
            sender,
            guard: None,
            vault: None,
            source: None,
            destination: None,
            batch: None,
            receipt: None,
        }
    }

    async fn advance(&mut self, next: MigrationState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {next}",
            self.state
        );
        let from = std::mem::replace(&mut self.state, next.clone());
        let event = MigrationEvent {
            profile_id: self.profile_id.clone(),
            from,
            to: next,
        };
        tracing::info!(%event, "migration transition");
        if let Some(sender) = &self.sender {
            if sender.send(event.clone()).await.is_err() {
                tracing::debug!("migration event receiver dropped");
            }
        }
        self.events.push(event);
    }

    async fn finish(mut self, result: Result<()>) -> MigrationReport {
        let outcome = match result {
            Ok(()) => {
                self.advance(MigrationState::Completed).await;
                MigrationOutcome::Completed
            }
            Err(error) => {
                let stage = self.state.stage().unwrap_or(FailureStage::Submission);
                tracing::warn!(
                    profile_id = ?self.profile_id.as_ref().map(ProfileId::as_str),
                    %stage,
                    entry_id = ?error.entry_id(),
                    retryable = error.is_retryable(),
                    error = %error,
                    "migration failed"
                );
                self.advance(MigrationState::Failed {
                    stage,
                    reason: error.to_string(),
                })
                .await;
                MigrationOutcome::Failed { stage, error }
            }
        };
        // Release the claim only after the terminal event is out.
        drop(self.guard.take());
        MigrationReport {
            profile_id: self.profile_id,
            events: self.events,
            vault: self.vault,
            source: self.source,
            destination: self.destination,
            batch: self.batch,
            receipt: self.receipt,
            outcome,
        }
    }
}

fn ensure_not_cancelled(cancel: Option<&watch::Receiver<bool>>, boundary: &str) -> Result<()> {
    match cancel {
        Some(rx) if *rx.borrow() => Err(KeyportError::Cancelled {
            reason: format!("cancelled {boundary}"),
        }),
        _ => Ok(()),
    }
}

/// Picks the address assets are moved from.
fn select_source(state: &KeyringState, entry_id: Option<&str>) -> Result<EvmAddress> {
    match entry_id {
        Some(id) => {
            let entry = state.entry(id).ok_or_else(|| KeyportError::MissingSourceKey {
                reason: format!("keyring has no entry {id}"),
            })?;
            entry.address().ok_or_else(|| KeyportError::MissingSourceKey {
                reason: format!("entry {id} carries no public key"),
            })
        }
        None => state
            .entries()
            .iter()
            .find_map(|entry| entry.address())
            .ok_or_else(|| KeyportError::MissingSourceKey {
                reason: "keyring has no entries".into(),
            }),
    }
}

// ---------------------------------------------------------------------------
// MigrationOrchestrator
// ---------------------------------------------------------------------------

/// Drives migrations for any number of profiles.
///
/// Share it behind an `Arc` to run profiles concurrently. Two runs for
/// the same profile never overlap; the second fails with
/// [`KeyportError::MigrationInProgress`].
pub struct MigrationOrchestrator {
    config: MigrationConfig,
    resolver: CurrentProfileResolver,
    keyrings: KeyringStore,
    migrator: Arc<VaultMigrator>,
    planner: AssetMigrationPlanner,
    inventory: Arc<dyn AssetInventory>,
    submitter: Arc<dyn ChainSubmitter>,
    in_flight: InFlightRegistry,
    events: Option<mpsc::Sender<MigrationEvent>>,
}

impl MigrationOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    ///
    /// # Errors
    ///
    /// [`KeyportError::ConfigError`] if `config` fails validation.
    pub fn new(
        config: MigrationConfig,
        store: Arc<dyn KeyValueStore>,
        cipher: Arc<dyn VaultCipher>,
        inventory: Arc<dyn AssetInventory>,
        submitter: Arc<dyn ChainSubmitter>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(AlgorithmRegistry::standard());
        Ok(Self {
            resolver: CurrentProfileResolver::new(
                Arc::clone(&store),
                config.current_profile_key.clone(),
            ),
            keyrings: KeyringStore::new(store, config.keyring_key_prefix.clone()),
            migrator: Arc::new(VaultMigrator::new(cipher, registry)),
            planner: AssetMigrationPlanner::from_config(&config),
            inventory,
            submitter,
            in_flight: InFlightRegistry::new(),
            events: None,
            config,
        })
    }

    /// Opens the event channel and returns its receiving end.
    ///
    /// The channel is bounded by `event_channel_size`; a slow reader
    /// slows runs down rather than losing events. Calling this again
    /// replaces the previous channel.
    pub fn subscribe(&mut self) -> mpsc::Receiver<MigrationEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_channel_size);
        self.events = Some(tx);
        rx
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Returns the registry of profiles with a run in progress.
    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Runs one migration to completion or failure.
    pub async fn run(&self, request: MigrationRequest) -> MigrationReport {
        let mut run = Run::new(self.events.clone());
        run.profile_id = request.profile_id.clone();
        run.destination = Some(request.destination);
        let result = self.drive(&mut run, request).await;
        run.finish(result).await
    }

    /// Retries only the submission of an unchanged `batch`.
    ///
    /// Runs `Idle → SubmittingBatch → Completed | Failed` under the same
    /// per-profile claim as [`run`](Self::run).
    pub async fn resubmit(&self, profile_id: ProfileId, batch: TransactionDatas) -> MigrationReport {
        let mut run = Run::new(self.events.clone());
        run.profile_id = Some(profile_id);
        run.batch = Some(batch);
        let result = self.drive_resubmit(&mut run).await;
        run.finish(result).await
    }

    async fn drive(&self, run: &mut Run, request: MigrationRequest) -> Result<()> {
        let MigrationRequest {
            profile_id,
            destination,
            secret,
            source_entry_id,
            cancel,
        } = request;
        let cancel = cancel.as_ref();

        ensure_not_cancelled(cancel, "before profile resolution")?;
        run.advance(MigrationState::ResolvingProfile).await;
        let profile_id = match profile_id {
            Some(id) => id,
            None => self.resolver.resolve_current_profile_id()?,
        };
        run.profile_id = Some(profile_id.clone());
        run.guard = Some(self.in_flight.try_acquire(&profile_id)?);

        ensure_not_cancelled(cancel, "before vault migration")?;
        run.advance(MigrationState::MigratingVault).await;
        let keyring = self.migrate_vault(run, &profile_id, secret).await?;

        ensure_not_cancelled(cancel, "before asset planning")?;
        run.advance(MigrationState::PlanningAssets).await;
        let source = select_source(&keyring, source_entry_id.as_deref())?;
        run.source = Some(source);
        let assets = self.inventory.snapshot(source).await?;
        tracing::debug!(%profile_id, %source, assets = assets.asset_count(), "inventory snapshot taken");
        let batch = self.planner.plan(&assets, source, destination)?;
        run.batch = Some(batch.clone());

        ensure_not_cancelled(cancel, "before submission")?;
        run.advance(MigrationState::SubmittingBatch).await;
        run.receipt = self.submit_batch(&profile_id, &batch).await?;
        Ok(())
    }

    async fn drive_resubmit(&self, run: &mut Run) -> Result<()> {
        let (Some(profile_id), Some(batch)) = (run.profile_id.clone(), run.batch.clone()) else {
            return Err(KeyportError::SubmissionFailed {
                retryable: false,
                reason: "resubmission without a batch".into(),
            });
        };
        run.guard = Some(self.in_flight.try_acquire(&profile_id)?);
        run.advance(MigrationState::SubmittingBatch).await;
        run.receipt = self.submit_batch(&profile_id, &batch).await?;
        Ok(())
    }

    /// Loads, migrates and persists the profile's keyring.
    ///
    /// The secret is moved into the blocking task and dropped there.
    async fn migrate_vault(
        &self,
        run: &mut Run,
        profile_id: &ProfileId,
        secret: VaultSecret,
    ) -> Result<KeyringState> {
        let stored = self.keyrings.load(profile_id)?;
        let from = stored.version();

        let keyring = if VaultMigrator::needs_migration(&stored) {
            let migrator = Arc::clone(&self.migrator);
            let migrated = tokio::task::spawn_blocking(move || migrator.migrate(&stored, &secret))
                .await
                .map_err(|e| KeyportError::CryptoError {
                    reason: format!("vault migration task failed: {e}"),
                })??;
            self.keyrings.save(profile_id, &migrated)?;
            migrated
        } else {
            stored
        };

        let outcome = VaultOutcome {
            from,
            to: keyring.version(),
            entries: keyring.entries().len(),
            persisted: from != keyring.version(),
        };
        tracing::info!(
            %profile_id,
            from = %outcome.from,
            to = %outcome.to,
            entries = outcome.entries,
            persisted = outcome.persisted,
            "vault stage done"
        );
        run.vault = Some(outcome);
        Ok(keyring)
    }

    /// Hands `batch` to the submitter under the configured timeout.
    ///
    /// An empty batch is not submitted and yields no receipt.
    async fn submit_batch(
        &self,
        profile_id: &ProfileId,
        batch: &TransactionDatas,
    ) -> Result<Option<SubmissionReceipt>> {
        if batch.is_empty() {
            tracing::info!(%profile_id, "no assets to move, nothing submitted");
            return Ok(None);
        }

        tracing::info!(
            %profile_id,
            calls = batch.len(),
            digest = %hex::encode(batch.digest()),
            "submitting migration batch"
        );
        let timeout = self.config.submission_timeout();
        let receipt = match tokio::time::timeout(timeout, self.submitter.submit(batch)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(KeyportError::SubmissionFailed {
                    retryable: true,
                    reason: format!("no outcome within {}s", timeout.as_secs()),
                })
            }
        };
        receipt.ensure_success(batch)?;
        tracing::info!(%profile_id, tx_id = %receipt.tx_id, "migration batch accepted");
        Ok(Some(receipt))
    }
}
