//! Search index management

use crate::models::LogEntry;
use crate::search::config::SearchConfig;
use crate::search::document::{build_log_schema, register_tokenizers, LogFields, SearchDocument};
use crate::search::error::{IndexResult, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Smallest writer heap Tantivy accepts for one indexing thread
const MIN_WRITER_HEAP: usize = 15_000_000;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents in the index
    pub total_documents: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Last commit timestamp
    pub last_commit: Option<DateTime<Utc>>,
}

/// Manages the Tantivy search index
pub struct IndexManager {
    /// The Tantivy index
    index: Index,

    /// Resolved schema fields
    fields: LogFields,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    /// Index reader, reloaded after every commit
    reader: IndexReader,

    /// Time of the last successful commit
    last_commit: RwLock<Option<DateTime<Utc>>>,
}

impl IndexManager {
    /// Open the index at `config.index_path`, or an in-memory index when unset
    pub async fn new(config: &SearchConfig) -> IndexResult<Self> {
        let schema = build_log_schema();

        let index = match &config.index_path {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
                })?;
                let directory = MmapDirectory::open(path)?;
                Index::open_or_create(directory, schema.clone()).map_err(|e| {
                    SearchError::IndexInitFailed(format!("Failed to open index: {}", e))
                })?
            }
            None => Index::create_in_ram(schema.clone()),
        };
        register_tokenizers(&index);

        let fields = LogFields::from_schema(&index.schema())?;

        let writer = index
            .writer_with_num_threads(1, config.writer_heap_size.max(MIN_WRITER_HEAP))
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        info!(
            persistent = config.index_path.is_some(),
            "Search index ready"
        );

        Ok(Self {
            index,
            fields,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            last_commit: RwLock::new(None),
        })
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Get the resolved fields
    pub fn fields(&self) -> &LogFields {
        &self.fields
    }

    /// Get the reader
    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    /// Index (or re-index) a single entry and commit
    pub async fn index_entry(&self, entry: &LogEntry) -> IndexResult<()> {
        self.index_entries(std::slice::from_ref(entry)).await.map(|_| ())
    }

    /// Index multiple entries in one commit, replacing earlier versions
    pub async fn index_entries(&self, entries: &[LogEntry]) -> IndexResult<usize> {
        let mut writer = self.writer.write().await;
        let mut indexed = 0;

        for entry in entries {
            let doc = entry.to_tantivy_doc(&self.fields)?;

            // Delete existing document with same ID
            if let Some(id) = entry.document_id() {
                writer.delete_term(Term::from_field_i64(self.fields.id, id));
            }

            writer.add_document(doc).map_err(|e| {
                SearchError::IndexingFailed(format!("Failed to add document {}: {}", indexed, e))
            })?;
            indexed += 1;
        }

        self.commit_locked(&mut writer).await?;
        debug!(indexed, "Indexed log entries");
        Ok(indexed)
    }

    /// Delete an entry by ID
    pub async fn delete_entry(&self, id: i64) -> IndexResult<()> {
        let mut writer = self.writer.write().await;
        writer.delete_term(Term::from_field_i64(self.fields.id, id));
        self.commit_locked(&mut writer).await
    }

    /// Commit pending changes
    pub async fn commit(&self) -> IndexResult<()> {
        let mut writer = self.writer.write().await;
        self.commit_locked(&mut writer).await
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> IndexResult<()> {
        let mut writer = self.writer.write().await;
        writer.delete_all_documents().map_err(|e| {
            SearchError::IndexingFailed(format!("Failed to clear index: {}", e))
        })?;
        self.commit_locked(&mut writer).await
    }

    async fn commit_locked(&self, writer: &mut IndexWriter) -> IndexResult<()> {
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader.reload()?;
        *self.last_commit.write().await = Some(Utc::now());
        Ok(())
    }

    /// Get index statistics
    pub async fn get_stats(&self) -> IndexResult<IndexStats> {
        let searcher = self.reader.searcher();

        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        Ok(IndexStats {
            total_documents,
            num_segments: searcher.segment_readers().len(),
            last_commit: *self.last_commit.read().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: i64, title: &str) -> LogEntry {
        let mut entry = LogEntry::new("alice", title, "body").with_logbook("ops");
        entry.id = Some(id);
        entry
    }

    #[tokio::test]
    async fn test_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchConfig {
            index_path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let manager = IndexManager::new(&config).await;
        assert!(manager.is_ok());
    }

    #[tokio::test]
    async fn test_index_stats() {
        let manager = IndexManager::new(&SearchConfig::default()).await.unwrap();
        let stats = manager.get_stats().await.unwrap();

        assert_eq!(stats.total_documents, 0);
        assert!(stats.last_commit.is_none());
    }

    #[tokio::test]
    async fn test_reindex_replaces_document() {
        let manager = IndexManager::new(&SearchConfig::default()).await.unwrap();
        manager.index_entry(&entry(1, "first")).await.unwrap();
        manager.index_entry(&entry(1, "first, edited")).await.unwrap();
        manager.index_entry(&entry(2, "second")).await.unwrap();

        let stats = manager.get_stats().await.unwrap();
        assert_eq!(stats.total_documents, 2);
        assert!(stats.last_commit.is_some());

        manager.delete_entry(1).await.unwrap();
        assert_eq!(manager.get_stats().await.unwrap().total_documents, 1);

        manager.clear_index().await.unwrap();
        assert_eq!(manager.get_stats().await.unwrap().total_documents, 0);
    }

    #[tokio::test]
    async fn test_reopen_persistent_index() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchConfig {
            index_path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        {
            let manager = IndexManager::new(&config).await.unwrap();
            manager.index_entry(&entry(7, "persisted")).await.unwrap();
        }

        let reopened = IndexManager::new(&config).await.unwrap();
        assert_eq!(reopened.get_stats().await.unwrap().total_documents, 1);
    }
}
