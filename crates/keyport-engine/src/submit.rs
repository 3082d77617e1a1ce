//! The chain submission collaborator.

use async_trait::async_trait;
use keyport_assets::batch::TransactionDatas;
use keyport_types::{KeyportError, Result};

/// Result of one call in a submitted batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallOutcome {
    /// The call executed.
    Succeeded,
    /// The call reverted or was rejected.
    Failed {
        /// Reason reported by the chain.
        reason: String,
    },
}

/// What the submitter reports back for a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmissionReceipt {
    /// Transaction identifier for tracking.
    pub tx_id: String,
    /// One outcome per call, index-aligned with the batch.
    pub outcomes: Vec<CallOutcome>,
}

impl SubmissionReceipt {
    /// Returns `true` if every call succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, CallOutcome::Succeeded))
    }

    /// Index and reason of the first failed call.
    pub fn first_failure(&self) -> Option<(usize, &str)> {
        self.outcomes.iter().enumerate().find_map(|(i, o)| match o {
            CallOutcome::Failed { reason } => Some((i, reason.as_str())),
            CallOutcome::Succeeded => None,
        })
    }

    /// Checks the receipt against the batch it answers.
    ///
    /// # Errors
    ///
    /// [`KeyportError::SubmissionFailed`] (not retryable) if the receipt
    /// does not cover every call or any call failed. Resubmitting the
    /// same batch would not change an on-chain revert.
    pub fn ensure_success(&self, batch: &TransactionDatas) -> Result<()> {
        if self.outcomes.len() != batch.len() {
            return Err(KeyportError::SubmissionFailed {
                retryable: false,
                reason: format!(
                    "receipt {} reports {} outcomes for {} calls",
                    self.tx_id,
                    self.outcomes.len(),
                    batch.len()
                ),
            });
        }
        if let Some((index, reason)) = self.first_failure() {
            return Err(KeyportError::SubmissionFailed {
                retryable: false,
                reason: format!("call {index} of {} failed: {reason}", self.tx_id),
            });
        }
        Ok(())
    }
}

/// Hands batches to a chain.
///
/// Implementations report transport problems (unreachable node, dropped
/// connection) as [`KeyportError::SubmissionFailed`] with
/// `retryable: true`. Retries are the caller's decision.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Submits `batch` and waits for its per-call outcome.
    async fn submit(&self, batch: &TransactionDatas) -> Result<SubmissionReceipt>;
}
