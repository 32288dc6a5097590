//! The external key-value store the pipeline persists into.
//!
//! Keys and values are plain strings: JSON for aggregate records, decimal
//! numbers for checkpoints. Each `set` is an independent single-key write;
//! no multi-key atomicity is assumed.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::IndexerError;

/// String key-value store backing aggregates and checkpoints.
///
/// Implementations include [`MemoryStore`] and the SQLite store in
/// `bridgeindex-storage`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, IndexerError>;

    async fn set(&self, key: &str, value: String) -> Result<(), IndexerError>;

    /// All entries whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, IndexerError>;
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory store for tests and one-off scans.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, IndexerError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexerError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, IndexerError> {
        self.data
            .lock()
            .map_err(|_| IndexerError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IndexerError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), IndexerError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, IndexerError> {
        Ok(self
            .lock()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
