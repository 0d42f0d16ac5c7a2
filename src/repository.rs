use crate::error::{LogbookError, Result};
use crate::models::{LogEntry, SearchResult};
use crate::query::SearchParameters;
use crate::search::SearchService;
use crate::sequence::SequenceAllocator;
use crate::state::{archive_key, EntryStore};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

/// What happened when the previous version of an entry was archived.
///
/// Only ever reported; an update proceeds whatever the outcome.
#[derive(Debug)]
pub enum ArchiveOutcome {
    Archived { key: String },
    /// Nothing persisted yet under that identifier
    Missing,
    Failed { key: Option<String>, error: LogbookError },
}

impl ArchiveOutcome {
    /// Log the outcome
    pub fn report(&self, entry_id: i64) {
        match self {
            ArchiveOutcome::Archived { key } => {
                tracing::debug!(entry_id, archive_key = %key, "Archived previous version");
            }
            ArchiveOutcome::Missing => {
                tracing::debug!(entry_id, "No previous version to archive");
            }
            ArchiveOutcome::Failed { key, error } => {
                tracing::error!(
                    entry_id,
                    archive_key = ?key,
                    error = %error,
                    "Failed to archive previous version, updating anyway"
                );
            }
        }
    }
}

/// Entry lifecycle: create, update with archival, lookup and search
pub struct LogRepository {
    store: Arc<dyn EntryStore>,
    search: Arc<SearchService>,
    sequence: Arc<SequenceAllocator>,
}

impl LogRepository {
    pub fn new(
        store: Arc<dyn EntryStore>,
        search: Arc<SearchService>,
        sequence: Arc<SequenceAllocator>,
    ) -> Self {
        Self {
            store,
            search,
            sequence,
        }
    }

    /// Get a reference to the entry store
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn search_service(&self) -> &Arc<SearchService> {
        &self.search
    }

    pub fn sequence(&self) -> &Arc<SequenceAllocator> {
        &self.sequence
    }

    /// Persist and index a new entry under a freshly allocated identifier.
    ///
    /// The entry is persisted before it is indexed. If indexing fails the
    /// error is returned but the entry stays stored; `reindex` makes it
    /// searchable again.
    pub async fn create(&self, mut entry: LogEntry) -> Result<LogEntry> {
        entry.validate()?;

        // a rejected entry never consumes an id
        let id = self.sequence.next();
        entry.id = Some(id);
        entry.created_date = Utc::now();
        entry.modify_date = None;

        self.store.put(&entry).await?;
        self.search.index_entry(&entry).await?;

        tracing::info!(entry_id = id, title = %entry.title, "Created log entry");
        Ok(entry)
    }

    /// Replace the mutable fields of an existing entry.
    ///
    /// The persisted version is archived first, on a best-effort basis. As with
    /// `create`, an indexing failure leaves the new version stored and is
    /// repaired by `reindex`.
    pub async fn update(&self, mut entry: LogEntry) -> Result<LogEntry> {
        let id = entry
            .id
            .ok_or_else(|| LogbookError::Validation("an update requires an entry id".to_string()))?;
        entry.validate()?;

        let current = self
            .store
            .get_versioned(id)
            .await?
            .ok_or_else(|| LogbookError::NotFound(format!("Log entry {} not found", id)))?;

        self.archive_current(id).await.report(id);

        entry.created_date = current.entry.created_date;
        entry.modify_date = Some(Utc::now());

        let revision = self.store.put(&entry).await?;
        self.search.index_entry(&entry).await?;

        tracing::info!(entry_id = id, revision, "Updated log entry");
        Ok(entry)
    }

    /// Copy the persisted version of `id` into the archive
    pub async fn archive_current(&self, id: i64) -> ArchiveOutcome {
        let current = match self.store.get_versioned(id).await {
            Ok(Some(current)) => current,
            Ok(None) => return ArchiveOutcome::Missing,
            Err(error) => return ArchiveOutcome::Failed { key: None, error },
        };

        let key = archive_key(id, current.revision);
        match self.store.archive(&key, &current.entry).await {
            Ok(()) => ArchiveOutcome::Archived { key },
            Err(error) => ArchiveOutcome::Failed {
                key: Some(key),
                error,
            },
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<LogEntry>> {
        Ok(self.store.get_versioned(id).await?.map(|v| v.entry))
    }

    /// Archived versions of an entry, newest modification first
    pub async fn find_archived(&self, id: i64) -> Result<Vec<LogEntry>> {
        self.store.archived_versions(id).await
    }

    pub async fn search(&self, parameters: &SearchParameters) -> Result<SearchResult> {
        self.search.search(parameters).await
    }

    /// Re-index every stored entry
    pub async fn reindex(&self) -> Result<usize> {
        let entries = self.store.list_entries().await?;
        Ok(self.search.rebuild_index(&entries).await?)
    }
}
