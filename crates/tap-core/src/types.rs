//! JSON-RPC data shapes returned by wallet providers, and the transaction
//! record handed to the UI.

use alloy_primitives::{U256, U64};
use serde::{Deserialize, Serialize};

use crate::units::format_native;

/// A transaction object inside `eth_getBlockByNumber(n, true)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub block_number: Option<U64>,
}

/// Block transactions are full objects when requested with `true`, but some
/// providers still hand back bare hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransaction {
    Full(RpcTransaction),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    #[serde(default)]
    pub number: Option<U64>,
    #[serde(default)]
    pub timestamp: Option<U64>,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

impl RpcBlock {
    /// Full transaction objects only.
    pub fn full_transactions(&self) -> impl Iterator<Item = &RpcTransaction> {
        self.transactions.iter().filter_map(|tx| match tx {
            BlockTransaction::Full(tx) => Some(tx),
            BlockTransaction::Hash(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `0x1` success, `0x0` reverted; absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|s| s != U64::ZERO)
    }
}

/// A transaction touching the session address, as shown in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRecord {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    /// Native value in whole units, e.g. `"0.25"`.
    pub value: String,
    pub block_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl TxRecord {
    /// Build a record from a block transaction. The block's own number is
    /// used when the transaction omits it.
    pub fn from_rpc(tx: &RpcTransaction, block: &RpcBlock) -> Self {
        let block_number = tx
            .block_number
            .or(block.number)
            .map_or(0, |n| n.to::<u64>());
        Self {
            hash: tx.hash.clone(),
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: format_native(tx.value),
            block_number,
            timestamp: block.timestamp.map(|t| t.to::<u64>()),
        }
    }
}

impl RpcTransaction {
    /// Case-insensitive match of `address` against sender or recipient.
    pub fn involves(&self, address: &str) -> bool {
        self.from.eq_ignore_ascii_case(address)
            || self.to.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(address))
    }
}
