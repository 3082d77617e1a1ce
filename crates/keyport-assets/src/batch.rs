//! The compiled call batch.
//!
//! [`TransactionDatas`] keeps three index-aligned sequences:
//! `addresses[i]` is called with `values[i]` wei and calldata
//! `datas[i]`. The sequences are private and only grow together through
//! [`TransactionDatas::push`], so their lengths cannot diverge.

use alloy_primitives::U256;
use keyport_crypto::hash::keccak256;
use keyport_types::{EvmAddress, KeyportError, Result};
use serde::{Deserialize, Serialize};

/// One call of a batch, borrowed from it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Call<'a> {
    /// Call target.
    pub address: EvmAddress,
    /// Native value sent with the call.
    pub value: U256,
    /// Calldata.
    pub data: &'a [u8],
}

/// An ordered, index-aligned batch of contract calls.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransactionDatas", into = "RawTransactionDatas")]
pub struct TransactionDatas {
    addresses: Vec<EvmAddress>,
    values: Vec<U256>,
    datas: Vec<Vec<u8>>,
}

impl TransactionDatas {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one call.
    pub fn push(&mut self, address: EvmAddress, value: U256, data: Vec<u8>) {
        self.addresses.push(address);
        self.values.push(value);
        self.datas.push(data);
    }

    /// Number of calls.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` if the batch has no calls.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Call targets, in order.
    pub fn addresses(&self) -> &[EvmAddress] {
        &self.addresses
    }

    /// Call values, in order.
    pub fn values(&self) -> &[U256] {
        &self.values
    }

    /// Calldata, in order.
    pub fn datas(&self) -> &[Vec<u8>] {
        &self.datas
    }

    /// Returns the `index`-th call.
    pub fn call(&self, index: usize) -> Option<Call<'_>> {
        Some(Call {
            address: *self.addresses.get(index)?,
            value: *self.values.get(index)?,
            data: self.datas.get(index)?,
        })
    }

    /// Iterates the calls in order.
    pub fn iter(&self) -> impl Iterator<Item = Call<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.call(i))
    }

    /// Keccak-256 over the canonical encoding of every call.
    ///
    /// Each call contributes `address (20) || value (32, big-endian) ||
    /// data length (8, big-endian) || data`. Two batches have the same
    /// digest exactly when they would submit the same calls in the same
    /// order, which is what preview/submit parity checks compare.
    pub fn digest(&self) -> [u8; 32] {
        let mut encoded = Vec::new();
        for call in self.iter() {
            encoded.extend_from_slice(call.address.as_bytes());
            encoded.extend_from_slice(&call.value.to_be_bytes::<32>());
            encoded.extend_from_slice(&(call.data.len() as u64).to_be_bytes());
            encoded.extend_from_slice(call.data);
        }
        keccak256(&encoded)
    }
}

/// Wire form: three parallel arrays, calldata as `0x` hex.
#[derive(Serialize, Deserialize)]
struct RawTransactionDatas {
    addresses: Vec<EvmAddress>,
    values: Vec<U256>,
    datas: Vec<String>,
}

impl TryFrom<RawTransactionDatas> for TransactionDatas {
    type Error = KeyportError;

    fn try_from(raw: RawTransactionDatas) -> Result<Self> {
        if raw.addresses.len() != raw.values.len() || raw.addresses.len() != raw.datas.len() {
            return Err(KeyportError::SerializationError {
                reason: format!(
                    "batch arrays differ in length: {} addresses, {} values, {} datas",
                    raw.addresses.len(),
                    raw.values.len(),
                    raw.datas.len()
                ),
            });
        }
        let datas = raw
            .datas
            .iter()
            .map(|d| {
                hex::decode(d.strip_prefix("0x").unwrap_or(d)).map_err(|e| {
                    KeyportError::SerializationError {
                        reason: format!("calldata is not hex: {e}"),
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            addresses: raw.addresses,
            values: raw.values,
            datas,
        })
    }
}

impl From<TransactionDatas> for RawTransactionDatas {
    fn from(batch: TransactionDatas) -> Self {
        Self {
            addresses: batch.addresses,
            values: batch.values,
            datas: batch
                .datas
                .iter()
                .map(|d| format!("0x{}", hex::encode(d)))
                .collect(),
        }
    }
}
