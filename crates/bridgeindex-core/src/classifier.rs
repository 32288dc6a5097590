//! Log classifier: maps a bridge log to the direction of its transfer.

use crate::catalog::TopicTable;
use crate::error::IndexerError;
use crate::types::{Direction, EventLog};

/// Classifies logs by `topic0`.
///
/// An unknown topic means the log filter or the topic table is wrong, so it
/// is an error rather than a skip.
#[derive(Debug, Clone)]
pub struct LogClassifier {
    topics: TopicTable,
}

impl LogClassifier {
    pub fn new(topics: TopicTable) -> Self {
        Self { topics }
    }

    pub fn classify(&self, log: &EventLog) -> Result<Direction, IndexerError> {
        let topic = log.topic0().unwrap_or_default();
        self.topics
            .direction(topic)
            .ok_or_else(|| IndexerError::UnknownTopic {
                topic: if topic.is_empty() { "<none>".into() } else { topic.to_string() },
                tx_hash: log.tx_hash.clone(),
            })
    }

    /// Topics to request from the log query.
    pub fn topics(&self) -> Vec<String> {
        self.topics.topics()
    }
}
