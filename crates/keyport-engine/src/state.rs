//! Orchestrator states, failure stages and transition events.

use std::fmt;

use keyport_types::ProfileId;

// ---------------------------------------------------------------------------
// FailureStage
// ---------------------------------------------------------------------------

/// The stage a failed run stopped in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureStage {
    /// Resolving the profile or claiming it for this run.
    Profile,
    /// Loading, migrating or persisting the keyring.
    Vault,
    /// Snapshotting holdings or planning the batch.
    Assets,
    /// Handing the batch to the chain.
    Submission,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::Vault => write!(f, "vault"),
            Self::Assets => write!(f, "assets"),
            Self::Submission => write!(f, "submission"),
        }
    }
}

// ---------------------------------------------------------------------------
// MigrationState
// ---------------------------------------------------------------------------

/// Lifecycle state of one migration run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MigrationState {
    /// Created, not started.
    Idle,
    /// Reading the current-profile pointer.
    ResolvingProfile,
    /// Upgrading the profile's keyring.
    MigratingVault,
    /// Building the asset batch.
    PlanningAssets,
    /// Waiting on the chain submitter.
    SubmittingBatch,
    /// Batch accepted. Terminal.
    Completed,
    /// Run stopped. Terminal.
    Failed {
        /// Stage that failed.
        stage: FailureStage,
        /// Rendered error.
        reason: String,
    },
}

impl MigrationState {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// The stage a failure in this state is attributed to.
    ///
    /// `None` for terminal states.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Idle | Self::ResolvingProfile => Some(FailureStage::Profile),
            Self::MigratingVault => Some(FailureStage::Vault),
            Self::PlanningAssets => Some(FailureStage::Assets),
            Self::SubmittingBatch => Some(FailureStage::Submission),
            Self::Completed | Self::Failed { .. } => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::ResolvingProfile => 1,
            Self::MigratingVault => 2,
            Self::PlanningAssets => 3,
            Self::SubmittingBatch => 4,
            Self::Completed | Self::Failed { .. } => 5,
        }
    }

    /// Returns `true` if moving from `self` to `next` goes strictly
    /// forward. Any non-terminal state may move to `Failed`.
    pub fn can_transition_to(&self, next: &MigrationState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed { .. } => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ResolvingProfile => write!(f, "resolving_profile"),
            Self::MigratingVault => write!(f, "migrating_vault"),
            Self::PlanningAssets => write!(f, "planning_assets"),
            Self::SubmittingBatch => write!(f, "submitting_batch"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { stage, reason } => write!(f, "failed({stage}): {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MigrationEvent
// ---------------------------------------------------------------------------

/// One state transition of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MigrationEvent {
    /// Profile of the run, once resolved.
    pub profile_id: Option<ProfileId>,
    /// State left.
    pub from: MigrationState,
    /// State entered.
    pub to: MigrationState,
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.profile_id {
            Some(profile_id) => write!(f, "[{profile_id}] {} -> {}", self.from, self.to),
            None => write!(f, "{} -> {}", self.from, self.to),
        }
    }
}
