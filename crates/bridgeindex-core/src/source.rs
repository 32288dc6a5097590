//! The chain-facing capability the scanner pulls data through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::IndexerError;
use crate::types::EventLog;

/// `eth_getLogs`-style query for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// Inclusive.
    pub from_block: u64,
    /// Inclusive.
    pub to_block: u64,
    /// Bridge contract address.
    pub address: String,
    /// Accepted `topic0` values (any-of).
    pub topics: Vec<String>,
}

/// A log inside a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: Vec<u8>,
}

/// The parts of a transaction receipt the decoder needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u128,
    /// Post-London receipts carry the price actually paid.
    pub effective_gas_price: Option<u128>,
    pub logs: Vec<ReceiptLog>,
}

/// The parts of a transaction the decoder needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    pub tx_hash: String,
    /// Calldata including the 4-byte selector.
    pub input: Vec<u8>,
    pub gas_price: Option<u128>,
}

/// Read access to one chain.
///
/// A failure from any method aborts the scan; implementations should not
/// retry on the scanner's behalf.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current head height.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// Unix timestamp (seconds) of a block.
    async fn block_timestamp(&self, number: u64) -> Result<i64, IndexerError>;

    /// Logs matching `query`, in chain order.
    async fn logs(&self, query: &LogQuery) -> Result<Vec<EventLog>, IndexerError>;

    /// Receipt of a mined transaction. May wait a bounded time for it.
    async fn receipt(&self, tx_hash: &str) -> Result<TxReceipt, IndexerError>;

    async fn transaction(&self, tx_hash: &str) -> Result<TxInfo, IndexerError>;
}

#[async_trait]
impl<T: ChainSource + ?Sized> ChainSource for Arc<T> {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        (**self).block_number().await
    }

    async fn block_timestamp(&self, number: u64) -> Result<i64, IndexerError> {
        (**self).block_timestamp(number).await
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<EventLog>, IndexerError> {
        (**self).logs(query).await
    }

    async fn receipt(&self, tx_hash: &str) -> Result<TxReceipt, IndexerError> {
        (**self).receipt(tx_hash).await
    }

    async fn transaction(&self, tx_hash: &str) -> Result<TxInfo, IndexerError> {
        (**self).transaction(tx_hash).await
    }
}
