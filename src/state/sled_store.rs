use crate::error::{LogbookError, Result};
use crate::models::LogEntry;
use crate::state::{sort_newest_first, EntryStore, VersionedEntry};
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Persistent entry store using Sled embedded database
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    entries_tree: sled::Tree,
    archive_tree: sled::Tree,
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(&path).map_err(|e| {
            LogbookError::Storage(format!("Failed to open Sled database: {}", e))
        })?;

        let entries_tree = db.open_tree("entries").map_err(|e| {
            LogbookError::Storage(format!("Failed to open entries tree: {}", e))
        })?;

        let archive_tree = db.open_tree("archive").map_err(|e| {
            LogbookError::Storage(format!("Failed to open archive tree: {}", e))
        })?;

        tracing::info!("Initialized Sled store at {:?}", path_str);

        Ok(Self {
            db: Arc::new(db),
            entries_tree,
            archive_tree,
        })
    }

    /// Big-endian keys keep the tree ordered by identifier
    fn entry_key(id: i64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn decode_key(key: &[u8]) -> Result<i64> {
        let bytes: [u8; 8] = key.try_into().map_err(|_| {
            LogbookError::Storage(format!("Malformed entry key of {} bytes", key.len()))
        })?;
        Ok(i64::from_be_bytes(bytes))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| {
            LogbookError::Storage(format!("Failed to serialize entry: {}", e))
        })
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| {
            LogbookError::Storage(format!("Failed to deserialize entry: {}", e))
        })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| {
            LogbookError::Storage(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl EntryStore for SledStore {
    async fn max_id(&self) -> Result<i64> {
        let last = self.entries_tree.last().map_err(|e| {
            LogbookError::Storage(format!("Failed to read highest entry: {}", e))
        })?;
        match last {
            Some((key, _)) => Self::decode_key(&key),
            None => Ok(0),
        }
    }

    async fn get_versioned(&self, id: i64) -> Result<Option<VersionedEntry>> {
        let bytes = self.entries_tree.get(Self::entry_key(id)).map_err(|e| {
            LogbookError::Storage(format!("Failed to get entry {}: {}", id, e))
        })?;
        bytes.map(|b| Self::deserialize(&b)).transpose()
    }

    async fn put(&self, entry: &LogEntry) -> Result<u64> {
        let id = entry
            .id
            .ok_or_else(|| LogbookError::Validation("cannot store an entry without an id".to_string()))?;
        let key = Self::entry_key(id);

        // read and bump the revision in one transaction
        let result: TransactionResult<u64, LogbookError> = self.entries_tree.transaction(|tx| {
            let revision = match tx.get(key)? {
                Some(bytes) => {
                    Self::deserialize::<VersionedEntry>(&bytes)
                        .map_err(ConflictableTransactionError::Abort)?
                        .revision
                        + 1
                }
                None => 1,
            };
            let versioned = VersionedEntry {
                entry: entry.clone(),
                revision,
            };
            let bytes = Self::serialize(&versioned).map_err(ConflictableTransactionError::Abort)?;
            tx.insert(&key[..], bytes)?;
            Ok(revision)
        });

        let revision = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => {
                LogbookError::Storage(format!("Failed to save entry {}: {}", id, e))
            }
        })?;

        tracing::debug!(entry_id = id, revision, "Entry saved");
        Ok(revision)
    }

    async fn archive(&self, key: &str, entry: &LogEntry) -> Result<()> {
        self.archive_tree
            .insert(key.as_bytes(), Self::serialize(entry)?)
            .map_err(|e| LogbookError::Storage(format!("Failed to archive {}: {}", key, e)))?;
        Ok(())
    }

    async fn archived_versions(&self, id: i64) -> Result<Vec<LogEntry>> {
        let prefix = format!("{}_v", id);
        let mut versions = Vec::new();
        for item in self.archive_tree.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = item.map_err(|e| {
                LogbookError::Storage(format!("Failed to read archive of {}: {}", id, e))
            })?;
            versions.push(Self::deserialize::<LogEntry>(&bytes)?);
        }
        sort_newest_first(&mut versions);
        Ok(versions)
    }

    async fn list_entries(&self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        for item in self.entries_tree.iter() {
            let (_, bytes) = item.map_err(|e| {
                LogbookError::Storage(format!("Failed to read entries: {}", e))
            })?;
            entries.push(Self::deserialize::<VersionedEntry>(&bytes)?.entry);
        }
        Ok(entries)
    }
}
