//! Storage and consistency engine for Waypost, backed by fjall

use fjall::{Config, Keyspace, PersistMode};
use std::path::Path;
use std::sync::Arc;
use waypost_core::*;

pub mod accounts;
pub mod places;
pub mod store;

pub use accounts::*;
pub use places::*;
pub use store::*;

/// Storage engine wrapping a fjall keyspace
#[derive(Clone)]
pub struct StorageEngine {
    keyspace: Arc<Keyspace>,
}

impl StorageEngine {
    /// Create or open a storage engine at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::new(path);
        let keyspace = Arc::new(config.open().map_err(|e| ApiError::Storage(e.to_string()))?);

        Ok(StorageEngine { keyspace })
    }

    /// Create temporary storage engine for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn temp() -> Result<(Self, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir().map_err(|e| ApiError::Internal(e.to_string()))?;
        let engine = Self::new(temp_dir.path())?;
        Ok((engine, temp_dir))
    }

    pub(crate) fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Persist all journaled writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| ApiError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_engine_creation() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        assert!(engine.persist().is_ok());
    }

    #[test]
    fn test_store_open() {
        let (engine, _temp) = StorageEngine::temp().unwrap();
        let store = Store::open(engine).unwrap();
        assert!(store.users().unwrap().is_empty());
    }
}
