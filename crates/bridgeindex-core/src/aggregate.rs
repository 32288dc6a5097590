//! Aggregate merger: folds decoded transfers into daily records and
//! advances the checkpoint.
//!
//! The aggregate write and the checkpoint write are separate store
//! operations. A crash between them leaves the aggregate ahead of the
//! checkpoint, and the restarted scan applies that log a second time
//! (at-least-once).

use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::error::IndexerError;
use crate::store::KeyValueStore;
use crate::types::{AggregateKey, DailyAggregate, DecodedTransfer, EventLog};

/// JSON-encoded [`DailyAggregate`] records in a [`KeyValueStore`].
#[derive(Clone)]
pub struct AggregateStore {
    store: Arc<dyn KeyValueStore>,
}

impl AggregateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, key: &AggregateKey) -> Result<Option<DailyAggregate>, IndexerError> {
        match self.store.get(&key.storage_key()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &AggregateKey, record: &DailyAggregate) -> Result<(), IndexerError> {
        self.store
            .set(&key.storage_key(), serde_json::to_string(record)?)
            .await
    }

    /// Every stored record of `chain` whose key starts with
    /// `{chain}:bridge:{date_prefix}`, ordered by key.
    pub async fn list(&self, chain: &str, date_prefix: Option<&str>) -> Result<Vec<(String, DailyAggregate)>, IndexerError> {
        let prefix = format!("{}{}", AggregateKey::chain_prefix(chain), date_prefix.unwrap_or_default());
        self.store
            .scan_prefix(&prefix)
            .await?
            .into_iter()
            .map(|(k, v)| -> Result<_, IndexerError> {
                Ok((k, serde_json::from_str::<DailyAggregate>(&v)?))
            })
            .collect()
    }
}

/// Applies transfers to their aggregate and records the scan position.
pub struct AggregateMerger {
    aggregates: AggregateStore,
    checkpoints: CheckpointStore,
}

impl AggregateMerger {
    pub fn new(aggregates: AggregateStore, checkpoints: CheckpointStore) -> Self {
        Self {
            aggregates,
            checkpoints,
        }
    }

    /// Merge one transfer and advance the checkpoint to `log`.
    ///
    /// Integrity failures abort before anything is written.
    pub async fn merge(
        &self,
        key: &AggregateKey,
        transfer: &DecodedTransfer,
        log: &EventLog,
    ) -> Result<DailyAggregate, IndexerError> {
        let record = match self.aggregates.get(key).await? {
            Some(mut existing) => {
                existing.absorb(key, transfer)?;
                existing
            }
            None => DailyAggregate::from_transfer(key, transfer)?,
        };

        self.aggregates.put(key, &record).await?;
        self.checkpoints.save(log.block_number, log.tx_index).await?;

        tracing::debug!(
            key = %key,
            tx_hash = %log.tx_hash,
            amount = transfer.amount,
            tx_count = record.tx_count,
            "aggregate merged"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Direction, GasStats};
    use chrono::NaiveDate;

    const BRIDGE: &str = "0xd123f70ae324d34a9e76b67a27bf77593ba8749f";

    fn setup() -> (Arc<MemoryStore>, AggregateMerger, CheckpointStore) {
        let kv = Arc::new(MemoryStore::new());
        let cps = CheckpointStore::new(kv.clone(), "bsc", BRIDGE);
        let merger = AggregateMerger::new(AggregateStore::new(kv.clone()), cps.clone());
        (kv, merger, cps)
    }

    fn log_at(block: u64, idx: u64) -> EventLog {
        EventLog {
            block_number: block,
            tx_hash: format!("0x{block:x}{idx:x}"),
            tx_index: idx,
            log_index: 0,
            topics: vec![],
            data: vec![],
        }
    }

    fn outbound(amount: f64) -> DecodedTransfer {
        DecodedTransfer {
            direction: Direction::Out,
            asset: "0x23b891e5c62e0955ae2bd185990103928ab817b3".into(),
            amount,
            fee: None,
            validator: None,
            destination: Some("1".into()),
        }
    }

    fn key(t: &DecodedTransfer) -> AggregateKey {
        AggregateKey::new("bsc", NaiveDate::from_ymd_opt(2021, 12, 1).unwrap(), t)
    }

    #[tokio::test]
    async fn first_then_subsequent_observation() {
        let (_kv, merger, cps) = setup();
        let t = outbound(7.5);

        let rec = merger.merge(&key(&t), &t, &log_at(100, 3)).await.unwrap();
        assert_eq!((rec.amount, rec.tx_count), (7.5, 1));

        let rec = merger.merge(&key(&t), &t, &log_at(101, 0)).await.unwrap();
        assert_eq!((rec.amount, rec.tx_count), (15.0, 2));

        let cp = cps.load().await.unwrap().unwrap();
        assert_eq!((cp.block_number, cp.tx_index), (101, Some(0)));
    }

    #[tokio::test]
    async fn integrity_failure_writes_nothing() {
        let (kv, merger, cps) = setup();
        let mut t = outbound(1.0);
        t.direction = Direction::In;
        t.destination = None;
        t.fee = Some(0.1);
        t.validator = Some(GasStats::default());

        // Stored IN record without validator data.
        let k = key(&t);
        kv.set(&k.storage_key(), r#"{"amount":1.0,"txCount":1}"#.into())
            .await
            .unwrap();

        let err = merger.merge(&k, &t, &log_at(200, 1)).await.unwrap_err();
        assert!(matches!(err, IndexerError::IntegrityMismatch { .. }));
        assert!(cps.load().await.unwrap().is_none());
        assert_eq!(
            kv.get(&k.storage_key()).await.unwrap().as_deref(),
            Some(r#"{"amount":1.0,"txCount":1}"#)
        );
    }

    #[tokio::test]
    async fn list_filters_by_chain_and_date() {
        let (_kv, merger, _cps) = setup();
        let t = outbound(2.0);
        merger.merge(&key(&t), &t, &log_at(1, 0)).await.unwrap();

        let other_day = AggregateKey::new("bsc", NaiveDate::from_ymd_opt(2021, 12, 2).unwrap(), &t);
        merger.merge(&other_day, &t, &log_at(2, 0)).await.unwrap();

        let store = merger.aggregates.clone();
        assert_eq!(store.list("bsc", None).await.unwrap().len(), 2);
        let day = store.list("bsc", Some("2021-12-02")).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].0, other_day.storage_key());
        assert!(store.list("ethereum", None).await.unwrap().is_empty());
    }
}
