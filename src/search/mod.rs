//! Full-text search over log entries, powered by Tantivy
//!
//! Executes [`CompiledQuery`](crate::query::CompiledQuery) trees produced by
//! the query compiler:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           Search Service API                     │
//! ├─────────────────────────────────────────────────┤
//! │  - search()        - execute()                  │
//! │  - index_entry()   - delete_entry()             │
//! │  - rebuild_index() - get_stats()                │
//! └─────────────────────────────────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌──────────────────┐   ┌──────────────────────────┐
//! │ Query Translator │   │      Index Manager       │
//! │ QueryNode → Query│   │ schema, writer, reader   │
//! └──────────────────┘   └──────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! ├─────────────────────────────────────────────────┤
//! │  - Analyzed text (title, description)           │
//! │  - Keywords (owner, level, tags, logbooks, ...) │
//! │  - Property paths (name / attribute / value)    │
//! │  - Fast fields (created date)                   │
//! │  - Doc store (full entry JSON)                  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use logbook_search::query::SearchParameters;
//! use logbook_search::search::{SearchConfig, SearchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let search = SearchService::new(&SearchConfig::default()).await?;
//!
//!     let parameters = SearchParameters::new()
//!         .with("desc", "beam*")
//!         .with("tags", "operations")
//!         .with("size", "20");
//!
//!     let result = search.search(&parameters).await?;
//!     println!("Found {} entries", result.hit_count);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod index;
mod service;
mod translate;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{build_log_schema, LogFields, SearchDocument};
pub use error::{IndexResult, SearchError};
pub use index::{IndexManager, IndexStats};
pub use service::SearchService;
pub use translate::QueryTranslator;
