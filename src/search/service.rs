//! Main search service implementation

use crate::error::Result;
use crate::models::{LogEntry, SearchResult};
use crate::query::{CompiledQuery, QueryCompiler, SearchParameters, SortOrder, SortSpec};
use crate::search::config::SearchConfig;
use crate::search::document::decode_entry;
use crate::search::error::{IndexResult, SearchError};
use crate::search::index::{IndexManager, IndexStats};
use crate::search::translate::QueryTranslator;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::{DocAddress, Order, TantivyDocument};
use tracing::{debug, info};

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Compiles search parameters and runs them against the log index
pub struct SearchService {
    /// Index manager
    index_manager: Arc<IndexManager>,

    /// Parameter compiler
    compiler: QueryCompiler,
}

impl SearchService {
    /// Create a new search service
    pub async fn new(config: &SearchConfig) -> Result<Self> {
        let compiler = QueryCompiler::new(config)?;
        let index_manager = Arc::new(IndexManager::new(config).await?);

        Ok(Self {
            index_manager,
            compiler,
        })
    }

    /// The compiler used by [`search`](Self::search)
    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Search log entries.
    ///
    /// Input problems are reported before the index is touched; any index
    /// failure is reported as `SearchUnavailable`.
    pub async fn search(&self, parameters: &SearchParameters) -> Result<SearchResult> {
        let compiled = self.compiler.compile(parameters)?;
        Ok(self.execute(&compiled).await?)
    }

    /// Run an already compiled query
    pub async fn execute(&self, compiled: &CompiledQuery) -> IndexResult<SearchResult> {
        let start_time = std::time::Instant::now();

        let translator = QueryTranslator::new(
            self.index_manager.index().clone(),
            *self.index_manager.fields(),
        );
        let tantivy_query = translator.translate(&compiled.query)?;

        let searcher = self.index_manager.reader().searcher();

        // Count total hits
        let hit_count = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Count failed: {}", e)))?
            as u64;

        let window = compiled.pagination;
        // a window starting past the last hit is empty
        let addresses: Vec<DocAddress> = if window.size == 0 || window.from >= hit_count as usize {
            Vec::new()
        } else {
            let collector = TopDocs::with_limit(window.size).and_offset(window.from);
            match compiled.sort {
                SortSpec::Score => searcher
                    .search(&*tantivy_query, &collector)
                    .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?
                    .into_iter()
                    .map(|(_, address)| address)
                    .collect(),
                SortSpec::CreatedDate(order) => searcher
                    .search(
                        &*tantivy_query,
                        &collector.order_by_fast_field::<i64>("created_date", order.into()),
                    )
                    .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?
                    .into_iter()
                    .map(|(_, address)| address)
                    .collect(),
            }
        };

        let mut logs = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;
            logs.push(decode_entry(&doc, self.index_manager.fields())?);
        }

        debug!(
            hits = hit_count,
            returned = logs.len(),
            mode = %compiled.mode,
            search_time_ms = start_time.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(SearchResult { hit_count, logs })
    }

    /// Index a single entry
    pub async fn index_entry(&self, entry: &LogEntry) -> IndexResult<()> {
        self.index_manager.index_entry(entry).await
    }

    /// Index multiple entries
    pub async fn index_entries(&self, entries: &[LogEntry]) -> IndexResult<usize> {
        self.index_manager.index_entries(entries).await
    }

    /// Delete an entry from the index
    pub async fn delete_entry(&self, id: i64) -> IndexResult<()> {
        self.index_manager.delete_entry(id).await
    }

    /// Get index statistics
    pub async fn get_stats(&self) -> IndexResult<IndexStats> {
        self.index_manager.get_stats().await
    }

    /// Commit pending changes
    pub async fn commit(&self) -> IndexResult<()> {
        self.index_manager.commit().await
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> IndexResult<()> {
        self.index_manager.clear_index().await
    }

    /// Rebuild the entire index from entries
    pub async fn rebuild_index(&self, entries: &[LogEntry]) -> IndexResult<usize> {
        self.clear_index().await?;
        let indexed = self.index_entries(entries).await?;
        info!(indexed, "Search index rebuilt");
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogbookError;
    use chrono::{Duration, Utc};

    fn entry(id: i64, title: &str, description: &str) -> LogEntry {
        let mut entry = LogEntry::new("alice", title, description)
            .with_logbook("operations")
            .with_created_date(Utc::now() - Duration::minutes(id));
        entry.id = Some(id);
        entry
    }

    async fn service_with(entries: &[LogEntry]) -> SearchService {
        let service = SearchService::new(&SearchConfig::default()).await.unwrap();
        service.index_entries(entries).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_search_all() {
        let service = service_with(&[entry(1, "one", "first"), entry(2, "two", "second")]).await;
        let result = service.search(&SearchParameters::new()).await.unwrap();
        assert_eq!(result.hit_count, 2);
        // newest first by default
        assert_eq!(result.logs[0].id, Some(1));
    }

    #[tokio::test]
    async fn test_zero_size_still_counts() {
        let service = service_with(&[entry(1, "one", "first"), entry(2, "two", "second")]).await;
        let result = service
            .search(&SearchParameters::new().with("size", "0"))
            .await
            .unwrap();
        assert_eq!(result.hit_count, 2);
        assert!(result.logs.is_empty());
    }

    #[tokio::test]
    async fn test_window_past_last_hit_is_empty() {
        let service = service_with(&[entry(1, "one", "first"), entry(2, "two", "second")]).await;
        for from in ["2", "100000000000", "9223372036854775807"] {
            let result = service
                .search(&SearchParameters::new().with("from", from))
                .await
                .unwrap();
            assert_eq!(result.hit_count, 2);
            assert!(result.logs.is_empty(), "from={}", from);
        }
    }

    #[tokio::test]
    async fn test_oversized_wildcard_is_client_error() {
        let service = service_with(&[entry(1, "one", "first")]).await;
        let err = service
            .search(&SearchParameters::new().with("desc", "?".repeat(400)))
            .await
            .unwrap_err();
        assert!(matches!(err, LogbookError::MalformedQuery(_)), "{:?}", err);
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_malformed_free_text() {
        let service = service_with(&[entry(1, "one", "first")]).await;
        let err = service
            .search(&SearchParameters::new().with("query", "nosuchfield:beam"))
            .await
            .unwrap_err();
        assert!(err.is_client_error(), "{:?}", err);
    }

    #[tokio::test]
    async fn test_rebuild_index() {
        let service = service_with(&[entry(1, "one", "first")]).await;
        let indexed = service
            .rebuild_index(&[entry(2, "two", "second"), entry(3, "three", "third")])
            .await
            .unwrap();
        assert_eq!(indexed, 2);
        assert_eq!(service.get_stats().await.unwrap().total_documents, 2);
    }

    #[tokio::test]
    async fn test_invalid_range_is_client_error() {
        let service = service_with(&[]).await;
        let err = service
            .search(&SearchParameters::new().with("start", "now").with("end", "2 days"))
            .await
            .unwrap_err();
        assert!(matches!(err, LogbookError::InvalidTimeRange { .. }));
    }
}
