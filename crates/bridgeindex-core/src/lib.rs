//! bridgeindex-core: the scan → classify → decode → merge pipeline for
//! cross-chain bridge activity.
//!
//! # Architecture
//!
//! ```text
//! ScanBuilder → BridgeScanner (one per chain)
//!                   ├── ChainSource       (log windows, receipts, tx input, block time)
//!                   ├── LogClassifier     (topic → Direction)
//!                   ├── ArgumentDecoder   (interface versions, newest → oldest)
//!                   ├── AggregateMerger   (per-day/per-asset/per-direction upserts)
//!                   └── CheckpointStore   (last (block, tx index) processed)
//!                                 └── KeyValueStore backend
//! ```

pub mod aggregate;
pub mod builder;
pub mod catalog;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod error;
pub mod scanner;
pub mod source;
pub mod store;
pub mod types;

pub use aggregate::{AggregateMerger, AggregateStore};
pub use builder::ScanBuilder;
pub use catalog::{BridgeTables, GenesisBlocks, InterfaceCatalog, InterfaceVersion, TokenDecimals, TopicTable};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use classifier::LogClassifier;
pub use config::{ScanConfig, DEFAULT_MAX_WINDOW};
pub use decoder::{ArgumentDecoder, InterfaceDecoder};
pub use error::IndexerError;
pub use scanner::{BridgeScanner, ScanReport};
pub use source::{ChainSource, LogQuery, ReceiptLog, TxInfo, TxReceipt};
pub use store::{KeyValueStore, MemoryStore};
pub use types::{
    to_units, AggregateKey, ArgValue, DailyAggregate, DecodedArgs, DecodedTransfer, Direction, EventLog, GasStats,
};
