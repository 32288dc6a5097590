//! Checkpoint store: persists the scan position for each bridge contract.
//!
//! A checkpoint is the `(block, tx index)` of the last log the scanner
//! attempted. On restart the scan resumes from it and skips every log of that
//! block at or below the stored transaction index.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::IndexerError;
use crate::store::KeyValueStore;

/// A persisted scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last processed block number.
    pub block_number: u64,
    /// Last processed transaction index within that block, when stored.
    pub tx_index: Option<u64>,
}

/// Reads and writes the checkpoint of one `(chain, bridge address)` pair.
///
/// The block and the index live under two keys and are written separately,
/// block first.
#[derive(Clone)]
pub struct CheckpointStore {
    store: Arc<dyn KeyValueStore>,
    chain: String,
    address: String,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn KeyValueStore>, chain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            store,
            chain: chain.into(),
            address: address.into(),
        }
    }

    /// `{chain}:logs:{address}:MAX_BLOCK_STORED`
    pub fn block_key(&self) -> String {
        format!("{}:logs:{}:MAX_BLOCK_STORED", self.chain, self.address)
    }

    /// `{chain}:logs:{address}:TX_INDEX`
    pub fn index_key(&self) -> String {
        format!("{}:logs:{}:TX_INDEX", self.chain, self.address)
    }

    /// Load the saved checkpoint (returns `None` if no block is stored).
    pub async fn load(&self) -> Result<Option<Checkpoint>, IndexerError> {
        let Some(block) = self.store.get(&self.block_key()).await? else {
            return Ok(None);
        };
        let block_number = parse_number(&self.block_key(), &block)?;
        let tx_index = match self.store.get(&self.index_key()).await? {
            Some(raw) => Some(parse_number(&self.index_key(), &raw)?),
            None => None,
        };
        Ok(Some(Checkpoint {
            block_number,
            tx_index,
        }))
    }

    /// Store the position of the log that was just processed.
    pub async fn save(&self, block_number: u64, tx_index: u64) -> Result<(), IndexerError> {
        self.store
            .set(&self.block_key(), block_number.to_string())
            .await?;
        self.store.set(&self.index_key(), tx_index.to_string()).await?;
        tracing::trace!(chain = %self.chain, block_number, tx_index, "checkpoint saved");
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, IndexerError> {
    raw.trim()
        .parse()
        .map_err(|_| IndexerError::Storage(format!("{key} holds non-numeric value {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const BRIDGE: &str = "0x2796317b0ff8538f253012862c06787adfb8ceb6";

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let kv = Arc::new(MemoryStore::new());
        let cps = CheckpointStore::new(kv.clone(), "ethereum", BRIDGE);

        assert!(cps.load().await.unwrap().is_none());

        cps.save(13_200_000, 42).await.unwrap();
        let cp = cps.load().await.unwrap().unwrap();
        assert_eq!(cp.block_number, 13_200_000);
        assert_eq!(cp.tx_index, Some(42));

        let raw = kv.get(&cps.block_key()).await.unwrap();
        assert_eq!(raw.as_deref(), Some("13200000"));
    }

    #[tokio::test]
    async fn block_without_index() {
        let kv = Arc::new(MemoryStore::new());
        let cps = CheckpointStore::new(kv.clone(), "bsc", BRIDGE);
        kv.set(&cps.block_key(), "500".into()).await.unwrap();

        let cp = cps.load().await.unwrap().unwrap();
        assert_eq!(cp.block_number, 500);
        assert_eq!(cp.tx_index, None);
    }

    #[tokio::test]
    async fn garbage_value_is_a_storage_error() {
        let kv = Arc::new(MemoryStore::new());
        let cps = CheckpointStore::new(kv.clone(), "bsc", BRIDGE);
        kv.set(&cps.block_key(), "latest".into()).await.unwrap();
        assert!(matches!(cps.load().await, Err(IndexerError::Storage(_))));
    }

    #[test]
    fn key_layout() {
        let cps = CheckpointStore::new(Arc::new(MemoryStore::new()), "polygon", BRIDGE);
        assert_eq!(
            cps.block_key(),
            format!("polygon:logs:{BRIDGE}:MAX_BLOCK_STORED")
        );
        assert_eq!(cps.index_key(), format!("polygon:logs:{BRIDGE}:TX_INDEX"));
    }
}
