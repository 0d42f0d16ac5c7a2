use crate::query::SearchParameters;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Logbook error types
#[derive(Error, Debug)]
pub enum LogbookError {
    /// Search input could not be parsed into terms or parameters
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Resolved start lies after the resolved end
    #[error("Invalid time range: start {start} is after end {end} (parameters: {parameters})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        parameters: SearchParameters,
    },

    /// The backing index could not be reached or failed unexpectedly
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// The startup read of the highest identifier failed
    #[error("Identity allocation degraded: {0}")]
    IdentityAllocationDegraded(String),

    /// Log entry failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entry store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogbookError {
    /// Whether the caller supplied bad input (a "bad request" outcome)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LogbookError::MalformedQuery(_)
                | LogbookError::InvalidTimeRange { .. }
                | LogbookError::Validation(_)
                | LogbookError::NotFound(_)
        )
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            LogbookError::MalformedQuery(_) => "MALFORMED_QUERY",
            LogbookError::InvalidTimeRange { .. } => "INVALID_TIME_RANGE",
            LogbookError::SearchUnavailable(_) => "SEARCH_UNAVAILABLE",
            LogbookError::IdentityAllocationDegraded(_) => "IDENTITY_ALLOCATION_DEGRADED",
            LogbookError::Validation(_) => "VALIDATION_ERROR",
            LogbookError::NotFound(_) => "NOT_FOUND",
            LogbookError::Storage(_) => "STORAGE_ERROR",
            LogbookError::Configuration(_) => "CONFIGURATION_ERROR",
            LogbookError::Serialization(_) => "SERIALIZATION_ERROR",
            LogbookError::Io(_) => "IO_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for LogbookError {
    fn from(err: serde_json::Error) -> Self {
        LogbookError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for LogbookError {
    fn from(err: validator::ValidationErrors) -> Self {
        LogbookError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for LogbookError {
    fn from(err: config::ConfigError) -> Self {
        LogbookError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LogbookError>;
