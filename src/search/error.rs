//! Error types for search operations

use crate::error::LogbookError;

/// Result type for index operations
pub type IndexResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Query parsing failed
    #[error("Query parsing failed: {0}")]
    QueryParsingFailed(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// A stored document could not be turned back into a log entry
    #[error("Document decoding failed: {0}")]
    DecodingFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::QueryParsingFailed(err.to_string())
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for SearchError {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        SearchError::IndexInitFailed(err.to_string())
    }
}

/// Index failures never leak engine detail: the caller sees either a
/// malformed free-text query or a generic unavailability.
impl From<SearchError> for LogbookError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::QueryParsingFailed(msg) => LogbookError::MalformedQuery(msg),
            err => {
                tracing::error!(error = %err, "Search index failure");
                LogbookError::SearchUnavailable("failed to complete search".to_string())
            }
        }
    }
}
