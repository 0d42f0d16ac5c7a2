pub mod factory;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_store, create_store};
pub use sled_store::SledStore;
pub use store::*;

use crate::error::Result;
use crate::models::LogEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A persisted entry with its revision number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntry {
    pub entry: LogEntry,
    /// Starts at 1 and grows by one on every write
    pub revision: u64,
}

/// Archive key of one revision of an entry
pub fn archive_key(id: i64, revision: u64) -> String {
    format!("{}_v{}", id, revision)
}

/// Trait for log entry storage operations
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Highest persisted identifier, 0 when the store is empty
    async fn max_id(&self) -> Result<i64>;

    /// Get an entry with its current revision
    async fn get_versioned(&self, id: i64) -> Result<Option<VersionedEntry>>;

    /// Write an entry (which must carry an id), returning its new revision
    async fn put(&self, entry: &LogEntry) -> Result<u64>;

    /// Copy an entry version into the archive under `key`
    async fn archive(&self, key: &str, entry: &LogEntry) -> Result<()>;

    /// Every archived version of an entry, most recently modified first
    async fn archived_versions(&self, id: i64) -> Result<Vec<LogEntry>>;

    /// All current entries, by identifier
    async fn list_entries(&self) -> Result<Vec<LogEntry>>;
}

/// Newest modification first; entries never modified sort by creation
pub(crate) fn sort_newest_first(entries: &mut [LogEntry]) {
    entries.sort_by(|a, b| {
        let a_date = a.modify_date.unwrap_or(a.created_date);
        let b_date = b.modify_date.unwrap_or(b.created_date);
        b_date.cmp(&a_date)
    });
}
