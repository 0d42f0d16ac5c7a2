//! Search-query compilation
//!
//! Turns an HTTP-shaped, case-insensitive, multi-valued parameter map into a
//! single [`CompiledQuery`]:
//!
//! ```text
//!  SearchParameters
//!        │
//!        ├──► terms::parse_terms ──┐
//!        ├──► range::resolve_range │
//!        │                         ▼
//!        │              builder::ClauseBuilder  (one required group per category)
//!        │                         │
//!        └────────────────► compiler::QueryCompiler
//!                                  │
//!                                  ▼
//!                           CompiledQuery { query, range, pagination, sort }
//! ```
//!
//! Compilation performs no I/O. Executing a compiled query is the job of
//! [`crate::search`].

pub mod builder;
pub mod clause;
pub mod compiler;
pub mod params;
pub mod range;
pub mod terms;
pub mod time;

pub use builder::ClauseBuilder;
pub use clause::{BoolQuery, BoostedField, Clause, IndexField, NestedPath, Occur, QueryNode};
pub use compiler::{CompiledQuery, Pagination, QueryCompiler, SearchMode, SortOrder, SortSpec};
pub use params::{ParameterKey, SearchParameters};
pub use range::{resolve_range, TemporalRange};
pub use terms::{parse_terms, SearchTerm};
