//! The block window scanner: drives one chain's scan from the resume point
//! to the target height.
//!
//! # Resume
//! Without an explicit start block the scan starts at the stored checkpoint
//! block, clamped up to the chain's genesis block, or at genesis when nothing
//! is stored. In the first window only, logs of the resume block whose
//! transaction index is at or below the stored index are skipped.
//!
//! # Windows
//! Each query covers `[start, min(start + max_window, till)]`; the next
//! window starts at `start + max_window + 1`. Logs are classified, decoded
//! and merged one at a time in the order the source returns them.
//!
//! Any error aborts the scan; the checkpoint reflects the last merged log.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::{AggregateMerger, AggregateStore};
use crate::catalog::BridgeTables;
use crate::checkpoint::CheckpointStore;
use crate::classifier::LogClassifier;
use crate::config::ScanConfig;
use crate::decoder::{ArgumentDecoder, InterfaceDecoder};
use crate::error::IndexerError;
use crate::source::{ChainSource, LogQuery};
use crate::store::KeyValueStore;
use crate::types::{AggregateKey, DailyAggregate, EventLog};

/// Summary of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub chain: String,
    /// First block of the first window.
    pub from_block: u64,
    /// Target height (snapshot of the head unless given explicitly).
    pub till_block: u64,
    pub windows: u64,
    /// Logs returned by the source, including skipped ones.
    pub logs_seen: u64,
    /// Logs dropped by the resume rule.
    pub logs_skipped: u64,
    pub logs_merged: u64,
    /// `(block, tx index)` of the last merged log.
    pub last_position: Option<(u64, u64)>,
}

/// Scans one bridge contract on one chain.
pub struct BridgeScanner<S, D> {
    config: ScanConfig,
    genesis_block: u64,
    source: S,
    classifier: LogClassifier,
    decoder: ArgumentDecoder<D>,
    merger: AggregateMerger,
    checkpoints: CheckpointStore,
}

impl<S: ChainSource, D: InterfaceDecoder> BridgeScanner<S, D> {
    pub fn new(
        config: ScanConfig,
        source: S,
        decoder: D,
        store: Arc<dyn KeyValueStore>,
        tables: Arc<BridgeTables>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let genesis_block = tables
            .genesis
            .get(&config.chain)
            .ok_or_else(|| IndexerError::Config(format!("no genesis block known for {}", config.chain)))?;

        let checkpoints = CheckpointStore::new(store.clone(), &config.chain, &config.bridge_address);
        let merger = AggregateMerger::new(AggregateStore::new(store), checkpoints.clone());
        Ok(Self {
            classifier: LogClassifier::new(tables.topics.clone()),
            decoder: ArgumentDecoder::new(decoder, tables),
            genesis_block,
            source,
            merger,
            checkpoints,
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Where the next run starts, and the stored tx index to skip through.
    pub async fn resume_point(&self) -> Result<(u64, Option<u64>), IndexerError> {
        if let Some(start) = self.config.start_block {
            return Ok((start, None));
        }
        Ok(match self.checkpoints.load().await? {
            Some(cp) => (cp.block_number.max(self.genesis_block), cp.tx_index),
            None => (self.genesis_block, None),
        })
    }

    /// Run the scan until the target height is passed or an error occurs.
    pub async fn run(&self) -> Result<ScanReport, IndexerError> {
        let chain = self.config.chain.as_str();
        let (mut start, skip_through) = self.resume_point().await?;
        let resume_block = start;
        let till = match self.config.till_block {
            Some(block) => block,
            None => self.source.block_number().await?,
        };

        tracing::info!(chain, from = start, till, "starting scan");

        let topics = self.classifier.topics();
        let mut report = ScanReport {
            chain: chain.to_string(),
            from_block: start,
            till_block: till,
            ..Default::default()
        };
        let started = Instant::now();
        let mut last_elapsed = 0.0_f64;
        let mut first_window = true;

        while start < till {
            let query = LogQuery {
                from_block: start,
                to_block: start.saturating_add(self.config.max_window).min(till),
                address: self.config.bridge_address.clone(),
                topics: topics.clone(),
            };
            let logs = self.source.logs(&query).await?;

            for log in &logs {
                if first_window && already_processed(log, resume_block, skip_through) {
                    report.logs_skipped += 1;
                    continue;
                }
                self.process(log).await?;
                report.logs_merged += 1;
                report.last_position = Some(log.position());
            }

            first_window = false;
            start = start.saturating_add(self.config.max_window.saturating_add(1));
            report.windows += 1;
            report.logs_seen += logs.len() as u64;

            let elapsed = started.elapsed().as_secs_f64();
            tracing::info!(
                chain,
                elapsed_s = elapsed,
                delta_s = elapsed - last_elapsed,
                events = report.logs_seen,
                block = start,
                "window complete"
            );
            last_elapsed = elapsed;
        }

        tracing::info!(
            chain,
            elapsed_s = started.elapsed().as_secs_f64(),
            merged = report.logs_merged,
            skipped = report.logs_skipped,
            "scan complete"
        );
        Ok(report)
    }

    /// Classify, decode and merge a single log.
    async fn process(&self, log: &EventLog) -> Result<DailyAggregate, IndexerError> {
        let chain = self.config.chain.as_str();
        let direction = self.classifier.classify(log)?;
        let transfer = self
            .decoder
            .decode(&self.source, chain, &self.config.bridge_address, direction, log)
            .await?;

        let timestamp = self.source.block_timestamp(log.block_number).await?;
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| IndexerError::Rpc(format!("block {} has invalid timestamp {timestamp}", log.block_number)))?
            .date_naive();

        let key = AggregateKey::new(chain, date, &transfer);
        self.merger.merge(&key, &transfer, log).await
    }
}

/// The first window re-reads the checkpoint block; drop what was merged already.
fn already_processed(log: &EventLog, resume_block: u64, skip_through: Option<u64>) -> bool {
    log.block_number == resume_block && skip_through.is_some_and(|idx| log.tx_index <= idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_at(block: u64, idx: u64) -> EventLog {
        EventLog {
            block_number: block,
            tx_hash: "0x0".into(),
            tx_index: idx,
            log_index: 0,
            topics: vec![],
            data: vec![],
        }
    }

    #[test]
    fn skip_rule_only_applies_to_resume_block() {
        assert!(already_processed(&log_at(100, 3), 100, Some(3)));
        assert!(already_processed(&log_at(100, 0), 100, Some(3)));
        assert!(!already_processed(&log_at(100, 4), 100, Some(3)));
        assert!(!already_processed(&log_at(101, 0), 100, Some(3)));
        assert!(!already_processed(&log_at(100, 0), 100, None));
    }
}
