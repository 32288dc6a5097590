//! Scan configuration.

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// Largest block span requested from a single log query.
pub const DEFAULT_MAX_WINDOW: u64 = 5_000;

/// Configuration for one chain's scan invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Chain slug (e.g. `"ethereum"`); also the key namespace in the store.
    pub chain: String,
    /// Bridge contract address, lowercase.
    pub bridge_address: String,
    /// Explicit first block. `None` = resume from the stored checkpoint.
    pub start_block: Option<u64>,
    /// Explicit last block. `None` = chain head at scan start.
    pub till_block: Option<u64>,
    /// How many blocks past the window start each log query covers.
    pub max_window: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chain: "ethereum".into(),
            bridge_address: String::new(),
            start_block: None,
            till_block: None,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.chain.is_empty() {
            return Err(IndexerError::Config("chain must not be empty".into()));
        }
        let addr = self.bridge_address.strip_prefix("0x").unwrap_or_default();
        if addr.len() != 40 || !addr.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IndexerError::Config(format!(
                "invalid bridge address {:?} for {}",
                self.bridge_address, self.chain
            )));
        }
        if let (Some(start), Some(till)) = (self.start_block, self.till_block) {
            if start > till {
                return Err(IndexerError::Config(format!(
                    "start block {start} is above till block {till}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScanConfig {
        ScanConfig {
            chain: "fantom".into(),
            bridge_address: "0xaf41a65f786339e7911f4acdad6bd49426f2dc6b".into(),
            ..Default::default()
        }
    }

    #[test]
    fn default_window() {
        assert_eq!(ScanConfig::default().max_window, 5_000);
    }

    #[test]
    fn validates_address_and_range() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.bridge_address = "0x1234".into();
        assert!(bad.validate().is_err());

        let mut inverted = config();
        inverted.start_block = Some(10);
        inverted.till_block = Some(5);
        assert!(inverted.validate().is_err());
    }
}
