//! bridgeindex-storage: key-value backends for aggregates and checkpoints.
//!
//! Backends:
//! - `memory`: [`MemoryStore`] from bridgeindex-core (no persistence)
//! - [`sqlite`]: SQLite via `sqlx` (embedded, single-file persistence)

#[cfg(feature = "sqlite")]
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bridgeindex_core::{IndexerError, KeyValueStore};

#[cfg(feature = "memory")]
pub use bridgeindex_core::MemoryStore;

/// Which backend to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        path: String,
    },
}

impl StoreConfig {
    /// Whether stored keys outlive the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Open the configured backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, IndexerError> {
    match config {
        #[cfg(feature = "memory")]
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite { path } => {
            tracing::info!(path = %path, "opening sqlite store");
            Ok(Arc::new(sqlite::SqliteStore::open(path).await?))
        }
        #[allow(unreachable_patterns)]
        other => Err(IndexerError::Config(format!(
            "store backend {other:?} is not compiled in"
        ))),
    }
}
