//! Search-query compiler, ranking engine and identity allocator for an
//! electronic logbook.
//!
//! Raw, multi-valued search parameters are compiled into a structured query
//! ([`query`]), executed against a Tantivy index of log entries ([`search`]),
//! and new entries receive strictly increasing identifiers from a
//! [`SequenceAllocator`].

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod search;
pub mod sequence;
pub mod state;

pub use config::Config;
pub use error::{LogbookError, Result};
pub use models::{LogEntry, SearchResult};
pub use query::{CompiledQuery, QueryCompiler, SearchParameters};
pub use repository::{ArchiveOutcome, LogRepository};
pub use search::{SearchConfig, SearchService};
pub use sequence::SequenceAllocator;
pub use state::{create_store, EntryStore};
