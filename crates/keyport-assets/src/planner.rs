//! Deterministic compilation of a holdings snapshot into a call batch.
//!
//! # Ordering
//!
//! 1. ERC-20 `transfer`, one per balance.
//! 2. ERC-721 `safeTransferFrom`, one per token.
//! 3. ERC-1155, grouped per contract: one `safeBatchTransferFrom` per
//!    contract, or one `safeTransferFrom` per token id for contracts
//!    listed as lacking batch support.
//! 4. The native balance, if non-zero, as a plain value transfer to the
//!    destination.
//!
//! Within each group the snapshot's set order applies (contract, then
//! token id, then amount). The planner reads no clock and draws no
//! randomness, so the same snapshot and addresses always give a
//! byte-identical batch.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;
use keyport_types::config::MigrationConfig;
use keyport_types::{EvmAddress, KeyportError, Result};

use crate::abi;
use crate::batch::TransactionDatas;
use crate::inventory::MigrationAssetsData;

/// Builds migration batches.
#[derive(Clone, Debug, Default)]
pub struct AssetMigrationPlanner {
    batch_unsupported: BTreeSet<EvmAddress>,
}

impl AssetMigrationPlanner {
    /// Creates a planner that batches every ERC-1155 contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a planner honoring the config's ERC-1155 exceptions.
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::with_batch_unsupported(config.erc1155_batch_unsupported.iter().copied())
    }

    /// Creates a planner that sends one call per token id to `contracts`.
    pub fn with_batch_unsupported(contracts: impl IntoIterator<Item = EvmAddress>) -> Self {
        Self {
            batch_unsupported: contracts.into_iter().collect(),
        }
    }

    /// Returns `true` if `contract` receives one batched ERC-1155 call.
    pub fn supports_batch(&self, contract: &EvmAddress) -> bool {
        !self.batch_unsupported.contains(contract)
    }

    /// Compiles `assets` into the batch moving them from `source` to
    /// `destination`.
    ///
    /// Every token call carries a value of zero.
    ///
    /// # Errors
    ///
    /// [`KeyportError::InvalidDestination`] if `destination` is the zero
    /// address or equals `source`.
    pub fn plan(
        &self,
        assets: &MigrationAssetsData,
        source: EvmAddress,
        destination: EvmAddress,
    ) -> Result<TransactionDatas> {
        if destination.is_zero() {
            return Err(KeyportError::InvalidDestination {
                reason: "destination address is empty".into(),
            });
        }
        if destination == source {
            return Err(KeyportError::InvalidDestination {
                reason: format!("destination {destination} equals the source address"),
            });
        }

        let mut batch = TransactionDatas::new();

        for asset in &assets.erc20 {
            batch.push(
                asset.contract_address,
                U256::ZERO,
                abi::erc20_transfer(destination, asset.amount),
            );
        }

        for asset in &assets.erc721 {
            batch.push(
                asset.contract_address,
                U256::ZERO,
                abi::erc721_safe_transfer_from(source, destination, asset.token_id),
            );
        }

        let mut by_contract: BTreeMap<EvmAddress, (Vec<U256>, Vec<U256>)> = BTreeMap::new();
        for asset in &assets.erc1155 {
            let (ids, amounts) = by_contract.entry(asset.contract_address).or_default();
            ids.push(asset.token_id);
            amounts.push(asset.amount);
        }
        for (contract, (ids, amounts)) in &by_contract {
            if self.supports_batch(contract) {
                batch.push(
                    *contract,
                    U256::ZERO,
                    abi::erc1155_safe_batch_transfer_from(source, destination, ids, amounts),
                );
            } else {
                for (id, amount) in ids.iter().zip(amounts) {
                    batch.push(
                        *contract,
                        U256::ZERO,
                        abi::erc1155_safe_transfer_from(source, destination, *id, *amount),
                    );
                }
            }
        }

        if let Some(native) = assets.native.filter(|v| !v.is_zero()) {
            batch.push(destination, native, Vec::new());
        }

        tracing::debug!(
            %source,
            %destination,
            calls = batch.len(),
            digest = %hex::encode(batch.digest()),
            "migration batch planned"
        );

        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
