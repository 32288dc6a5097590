//! Error types for the bridge indexing pipeline.

use thiserror::Error;

/// Errors that can occur while scanning, decoding, or merging.
///
/// Every variant aborts the scan of the chain it occurred on. Nothing here is
/// retried; re-invoking the scan resumes from the last stored checkpoint.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized topic {topic} in tx {tx_hash}")]
    UnknownTopic { topic: String, tx_hash: String },

    #[error("No interface version ({tried}) recognizes receipt of tx {tx_hash} on {chain}")]
    InterfacesExhausted {
        chain: String,
        tx_hash: String,
        tried: String,
    },

    #[error("Input of tx {tx_hash} on {chain} matches no method of interface '{version}'")]
    UnrecognizedCall {
        chain: String,
        tx_hash: String,
        version: String,
    },

    #[error("No token argument: chain = {chain}, tx_hash = {tx_hash}")]
    MissingToken { chain: String, tx_hash: String },

    #[error("Missing argument '{name}' in tx {tx_hash}")]
    MissingArgument { name: String, tx_hash: String },

    #[error("No registered decimals for token {asset} on {chain} (tx {tx_hash})")]
    UnknownAsset {
        chain: String,
        asset: String,
        tx_hash: String,
    },

    #[error("Aggregate integrity violation for {key}: {reason}")]
    IntegrityMismatch { key: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` for failures caused by unexpected data rather than I/O.
    ///
    /// These point at a filter bug, a missing interface version, or a
    /// corrupted record, so re-running the scan will hit them again.
    pub fn is_fatal_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownTopic { .. }
                | Self::InterfacesExhausted { .. }
                | Self::UnrecognizedCall { .. }
                | Self::MissingToken { .. }
                | Self::MissingArgument { .. }
                | Self::UnknownAsset { .. }
                | Self::IntegrityMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("invalid JSON record: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_errors_are_classified() {
        let err = IndexerError::UnknownTopic {
            topic: "0xdead".into(),
            tx_hash: "0x01".into(),
        };
        assert!(err.is_fatal_integrity());
        assert!(!IndexerError::Rpc("connection reset".into()).is_fatal_integrity());
        assert!(!IndexerError::Storage("disk full".into()).is_fatal_integrity());
    }

    #[test]
    fn missing_token_message_names_chain_and_tx() {
        let err = IndexerError::MissingToken {
            chain: "bsc".into(),
            tx_hash: "0xabc".into(),
        };
        assert_eq!(err.to_string(), "No token argument: chain = bsc, tx_hash = 0xabc");
    }
}
