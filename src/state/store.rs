use crate::error::{LogbookError, Result};
use crate::models::LogEntry;
use crate::state::{sort_newest_first, EntryStore, VersionedEntry};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory entry store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<DashMap<i64, VersionedEntry>>,
    archive: Arc<DashMap<String, LogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            archive: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for InMemoryStore {
    async fn max_id(&self) -> Result<i64> {
        Ok(self.entries.iter().map(|e| *e.key()).max().unwrap_or(0))
    }

    async fn get_versioned(&self, id: i64) -> Result<Option<VersionedEntry>> {
        Ok(self.entries.get(&id).map(|entry| entry.clone()))
    }

    async fn put(&self, entry: &LogEntry) -> Result<u64> {
        let id = entry
            .id
            .ok_or_else(|| LogbookError::Validation("cannot store an entry without an id".to_string()))?;

        let mut versioned = self.entries.entry(id).or_insert_with(|| VersionedEntry {
            entry: entry.clone(),
            revision: 0,
        });
        versioned.entry = entry.clone();
        versioned.revision += 1;
        let revision = versioned.revision;

        tracing::debug!(entry_id = id, revision, "Entry saved");
        Ok(revision)
    }

    async fn archive(&self, key: &str, entry: &LogEntry) -> Result<()> {
        self.archive.insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn archived_versions(&self, id: i64) -> Result<Vec<LogEntry>> {
        let prefix = format!("{}_v", id);
        let mut versions: Vec<LogEntry> = self
            .archive
            .iter()
            .filter(|e| e.key().starts_with(&prefix))
            .map(|e| e.value().clone())
            .collect();
        sort_newest_first(&mut versions);
        Ok(versions)
    }

    async fn list_entries(&self) -> Result<Vec<LogEntry>> {
        let mut entries: Vec<LogEntry> = self.entries.iter().map(|e| e.entry.clone()).collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }
}
