//! Fluent builder API for bridge scanners.
//!
//! # Example
//!
//! ```rust,no_run
//! use bridgeindex_core::ScanBuilder;
//!
//! let config = ScanBuilder::new()
//!     .chain("ethereum")
//!     .bridge("0x2796317b0fF8538F253012862c06787Adfb8cEb6")
//!     .till_block(14_000_000)
//!     .max_window(2_000)
//!     .build_config();
//! ```

use std::sync::Arc;

use crate::catalog::BridgeTables;
use crate::config::ScanConfig;
use crate::decoder::InterfaceDecoder;
use crate::error::IndexerError;
use crate::scanner::BridgeScanner;
use crate::source::ChainSource;
use crate::store::KeyValueStore;

/// Fluent builder for [`ScanConfig`] and [`BridgeScanner`].
#[derive(Default)]
pub struct ScanBuilder {
    config: ScanConfig,
}

impl ScanBuilder {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    /// Set the chain to scan.
    pub fn chain(mut self, chain: impl Into<String>) -> Self {
        self.config.chain = chain.into();
        self
    }

    /// Set the bridge contract address (normalized to lowercase).
    pub fn bridge(mut self, address: impl AsRef<str>) -> Self {
        self.config.bridge_address = address.as_ref().to_ascii_lowercase();
        self
    }

    /// Start at an explicit block instead of the stored checkpoint.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = Some(block);
        self
    }

    /// Stop at an explicit block instead of the current head.
    pub fn till_block(mut self, block: u64) -> Self {
        self.config.till_block = Some(block);
        self
    }

    /// Set the log query window.
    pub fn max_window(mut self, blocks: u64) -> Self {
        self.config.max_window = blocks;
        self
    }

    /// Build the `ScanConfig`.
    pub fn build_config(self) -> ScanConfig {
        self.config
    }

    /// Validate the configuration and assemble a scanner.
    pub fn build<S: ChainSource, D: InterfaceDecoder>(
        self,
        source: S,
        decoder: D,
        store: Arc<dyn KeyValueStore>,
        tables: Arc<BridgeTables>,
    ) -> Result<BridgeScanner<S, D>, IndexerError> {
        BridgeScanner::new(self.config, source, decoder, store, tables)
    }
}
