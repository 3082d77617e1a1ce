//! Holdings snapshot and the inventory collaborator that produces it.
//!
//! Sets are `BTreeSet`s ordered by contract address, then token id,
//! then amount. Iterating a snapshot therefore always yields the same
//! sequence for the same holdings, whatever order the indexer reported
//! them in.

use std::collections::BTreeSet;

use alloy_primitives::U256;
use async_trait::async_trait;
use keyport_types::{EvmAddress, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A fungible token balance.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Asset {
    /// Token contract.
    pub contract_address: EvmAddress,
    /// Amount in the token's smallest unit.
    pub amount: U256,
}

/// A single non-fungible token.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721Asset {
    /// Collection contract.
    pub contract_address: EvmAddress,
    /// Token id.
    pub token_id: U256,
}

/// A multi-token balance.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc1155Asset {
    /// Multi-token contract.
    pub contract_address: EvmAddress,
    /// Token id.
    pub token_id: U256,
    /// Amount of `token_id` held.
    pub amount: U256,
}

// ---------------------------------------------------------------------------
// MigrationAssetsData
// ---------------------------------------------------------------------------

/// Snapshot of everything to move out of a source address.
///
/// Built fresh for each run and treated as immutable input to the
/// planner.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MigrationAssetsData {
    /// ERC-20 balances.
    #[serde(default)]
    pub erc20: BTreeSet<Erc20Asset>,
    /// ERC-721 tokens.
    #[serde(default)]
    pub erc721: BTreeSet<Erc721Asset>,
    /// ERC-1155 balances.
    #[serde(default)]
    pub erc1155: BTreeSet<Erc1155Asset>,
    /// Native coin balance to sweep, moved after every token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<U256>,
}

impl MigrationAssetsData {
    /// Number of distinct holdings, counting a non-zero native balance as one.
    pub fn asset_count(&self) -> usize {
        let native = usize::from(self.native.is_some_and(|v| !v.is_zero()));
        self.erc20.len() + self.erc721.len() + self.erc1155.len() + native
    }

    /// Returns `true` if there is nothing to move.
    pub fn is_empty(&self) -> bool {
        self.asset_count() == 0
    }
}

// ---------------------------------------------------------------------------
// AssetInventory
// ---------------------------------------------------------------------------

/// Source of holdings snapshots (an indexer, a node, a fixture).
#[async_trait]
pub trait AssetInventory: Send + Sync {
    /// Returns a fresh snapshot of what `owner` holds.
    async fn snapshot(&self, owner: EvmAddress) -> Result<MigrationAssetsData>;
}

/// An inventory that always reports the same snapshot.
///
/// Used for offline planning from a JSON file and in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticInventory {
    assets: MigrationAssetsData,
}

impl StaticInventory {
    /// Creates an inventory reporting `assets` for every owner.
    pub fn new(assets: MigrationAssetsData) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl AssetInventory for StaticInventory {
    async fn snapshot(&self, owner: EvmAddress) -> Result<MigrationAssetsData> {
        tracing::debug!(%owner, assets = self.assets.asset_count(), "static inventory snapshot");
        Ok(self.assets.clone())
    }
}
