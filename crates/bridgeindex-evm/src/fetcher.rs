//! EVM chain source over JSON-RPC.
//!
//! Uses `eth_blockNumber`, `eth_getBlockByNumber`, `eth_getLogs`,
//! `eth_getTransactionReceipt` and `eth_getTransactionByHash`. Receipts are
//! polled until they appear or the configured wait elapses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use bridgeindex_core::{ChainSource, EventLog, IndexerError, LogQuery, ReceiptLog, TxInfo, TxReceipt};

use crate::rpc::RpcTransport;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "transactionIndex")]
    pub tx_index: String,
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    pub fn into_event_log(self) -> Result<EventLog, IndexerError> {
        Ok(EventLog {
            block_number: parse_quantity(&self.block_number)?,
            tx_index: parse_quantity(&self.tx_index)?,
            log_index: parse_quantity(&self.log_index)?,
            tx_hash: self.tx_hash.to_ascii_lowercase(),
            topics: self.topics.iter().map(|t| t.to_ascii_lowercase()).collect(),
            data: parse_bytes(&self.data)?,
        })
    }
}

/// A raw receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    pub block_number: String,
    pub gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    pub logs: Vec<RawReceiptLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

impl RawReceipt {
    pub fn into_receipt(self) -> Result<TxReceipt, IndexerError> {
        let logs = self
            .logs
            .into_iter()
            .map(|l| {
                Ok(ReceiptLog {
                    address: l.address.to_ascii_lowercase(),
                    topics: l.topics.iter().map(|t| t.to_ascii_lowercase()).collect(),
                    data: parse_bytes(&l.data)?,
                })
            })
            .collect::<Result<Vec<_>, IndexerError>>()?;
        Ok(TxReceipt {
            tx_hash: self.transaction_hash.to_ascii_lowercase(),
            block_number: parse_quantity(&self.block_number)?,
            gas_used: parse_quantity(&self.gas_used)?,
            effective_gas_price: self.effective_gas_price.as_deref().map(parse_quantity::<u128>).transpose()?,
            logs,
        })
    }
}

/// A raw transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub input: String,
    #[serde(default)]
    pub gas_price: Option<String>,
}

impl RawTransaction {
    pub fn into_tx_info(self) -> Result<TxInfo, IndexerError> {
        Ok(TxInfo {
            tx_hash: self.hash.to_ascii_lowercase(),
            input: parse_bytes(&self.input)?,
            gas_price: self.gas_price.as_deref().map(parse_quantity::<u128>).transpose()?,
        })
    }
}

/// Receipt polling settings.
#[derive(Debug, Clone)]
pub struct RpcSourceConfig {
    /// How long to wait for a receipt before failing.
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for RpcSourceConfig {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(60),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}

/// [`ChainSource`] backed by an [`RpcTransport`].
pub struct RpcSource<T> {
    transport: T,
    config: RpcSourceConfig,
}

impl<T: RpcTransport> RpcSource<T> {
    pub fn new(transport: T, config: RpcSourceConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<TxReceipt, IndexerError> {
        loop {
            let result = self
                .transport
                .call("eth_getTransactionReceipt", vec![json!(tx_hash)])
                .await?;
            if !result.is_null() {
                let raw: RawReceipt = serde_json::from_value(result)
                    .map_err(|e| IndexerError::Rpc(format!("receipt {tx_hash}: unexpected response: {e}")))?;
                return raw.into_receipt();
            }
            tracing::debug!(tx_hash, url = self.transport.url(), "receipt not available yet");
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl<T: RpcTransport> ChainSource for RpcSource<T> {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let result = self.transport.call("eth_blockNumber", vec![]).await?;
        parse_quantity(as_str(&result, "eth_blockNumber")?)
    }

    async fn block_timestamp(&self, number: u64) -> Result<i64, IndexerError> {
        let block = self
            .transport
            .call("eth_getBlockByNumber", vec![json!(format!("{number:#x}")), json!(false)])
            .await?;
        if block.is_null() {
            return Err(IndexerError::Rpc(format!("block {number} not found")));
        }
        let ts: u64 = parse_quantity(as_str(&block["timestamp"], "block timestamp")?)?;
        i64::try_from(ts).map_err(|_| IndexerError::Rpc(format!("block {number} timestamp {ts} out of range")))
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<EventLog>, IndexerError> {
        let filter = json!({
            "fromBlock": format!("{:#x}", query.from_block),
            "toBlock": format!("{:#x}", query.to_block),
            "address": query.address,
            "topics": [query.topics],
        });
        let result = self.transport.call("eth_getLogs", vec![filter]).await?;
        let raw: Vec<RawLog> = serde_json::from_value(result)
            .map_err(|e| IndexerError::Rpc(format!("eth_getLogs: unexpected response: {e}")))?;

        let mut logs = Vec::with_capacity(raw.len());
        for log in raw {
            if log.removed.unwrap_or(false) {
                continue;
            }
            logs.push(log.into_event_log()?);
        }
        Ok(logs)
    }

    async fn receipt(&self, tx_hash: &str) -> Result<TxReceipt, IndexerError> {
        tokio::time::timeout(self.config.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| {
                IndexerError::Rpc(format!(
                    "timed out after {}s waiting for receipt {tx_hash}",
                    self.config.receipt_timeout.as_secs()
                ))
            })?
    }

    async fn transaction(&self, tx_hash: &str) -> Result<TxInfo, IndexerError> {
        let result = self
            .transport
            .call("eth_getTransactionByHash", vec![json!(tx_hash)])
            .await?;
        if result.is_null() {
            return Err(IndexerError::Rpc(format!("transaction {tx_hash} not found")));
        }
        let raw: RawTransaction = serde_json::from_value(result)
            .map_err(|e| IndexerError::Rpc(format!("transaction {tx_hash}: unexpected response: {e}")))?;
        raw.into_tx_info()
    }
}

fn as_str<'a>(v: &'a Value, what: &str) -> Result<&'a str, IndexerError> {
    v.as_str()
        .ok_or_else(|| IndexerError::Rpc(format!("{what}: expected hex string, got {v}")))
}

/// Parse a hex quantity (`0x1a`) into any unsigned integer type.
pub fn parse_quantity<N: TryFrom<u128>>(s: &str) -> Result<N, IndexerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(digits, 16)
        .ok()
        .and_then(|v| N::try_from(v).ok())
        .ok_or_else(|| IndexerError::Rpc(format!("invalid quantity {s:?}")))
}

/// Decode `0x`-prefixed hex data.
pub fn parse_bytes(s: &str) -> Result<Vec<u8>, IndexerError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| IndexerError::Decode(format!("invalid hex data: {e}")))
}
