use crate::config::{StorageBackend, StorageConfig};
use crate::error::{LogbookError, Result};
use crate::state::{EntryStore, InMemoryStore, SledStore};
use std::sync::Arc;

/// Create an entry store based on configuration
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn EntryStore>> {
    match config.backend {
        StorageBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                LogbookError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = SledStore::new(path)?;
            Ok(Arc::new(store))
        }

        StorageBackend::Memory => Ok(create_in_memory_store()),
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn EntryStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}
