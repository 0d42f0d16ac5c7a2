//! Assembling category clauses, the temporal group, pagination and sort
//! into one compiled query

use crate::error::{LogbookError, Result};
use crate::query::builder::ClauseBuilder;
use crate::query::clause::{BoolQuery, BoostedField, Clause, IndexField, NestedPath, Occur, QueryNode};
use crate::query::params::{ParameterKey, SearchParameters};
use crate::query::range::{resolve_range, TemporalRange};
use crate::search::SearchConfig;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, warn};

/// Result window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub from: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Result ordering; ties and score ordering are always descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// Relevance, best first
    Score,
    /// Entry creation time
    CreatedDate(SortOrder),
}

/// Whether a free-text `query` parameter drove the compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchMode {
    Structured,
    Hybrid,
}

/// Everything the index needs to run one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub query: QueryNode,
    pub range: TemporalRange,
    pub pagination: Pagination,
    pub sort: SortSpec,
    pub mode: SearchMode,
}

/// Turns a parameter map into a [`CompiledQuery`].
///
/// Holds configuration only; compilation is pure and safe to call from any
/// number of tasks at once.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    default_size: usize,
    max_size: usize,
    zone: Tz,
    free_text_fields: Vec<BoostedField>,
}

impl QueryCompiler {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let zone = config.timezone.parse::<Tz>().map_err(|_| {
            LogbookError::Configuration(format!("unknown search timezone '{}'", config.timezone))
        })?;

        Ok(Self {
            default_size: config.default_size.min(config.max_size),
            max_size: config.max_size,
            zone,
            free_text_fields: vec![
                BoostedField {
                    field: IndexField::Title,
                    boost: config.title_boost,
                },
                BoostedField {
                    field: IndexField::Description,
                    boost: config.description_boost,
                },
                BoostedField {
                    field: IndexField::Owner,
                    boost: config.owner_boost,
                },
                BoostedField {
                    field: IndexField::Level,
                    boost: config.level_boost,
                },
            ],
        })
    }

    pub fn compile(&self, parameters: &SearchParameters) -> Result<CompiledQuery> {
        self.compile_at(parameters, Utc::now())
    }

    /// Compile with relative times resolved against `now`
    pub fn compile_at(&self, parameters: &SearchParameters, now: DateTime<Utc>) -> Result<CompiledQuery> {
        let range = resolve_range(parameters, now, self.zone)?;
        let free_text = free_text(parameters);
        let mode = if free_text.is_some() {
            SearchMode::Hybrid
        } else {
            SearchMode::Structured
        };

        // Hybrid mode keeps the categories only as relevance hints
        let category_occur = match mode {
            SearchMode::Structured => Occur::Must,
            SearchMode::Hybrid => Occur::Should,
        };

        let builder = ClauseBuilder::new(parameters.contains(ParameterKey::Fuzzy));
        let mut root = BoolQuery::new();
        let mut compiled_categories: Vec<ParameterKey> = Vec::new();

        for (raw_key, key, _) in parameters.iter() {
            let Some(key) = key else {
                debug!(key = %raw_key, "Ignoring unknown search parameter");
                continue;
            };
            if !key.is_category() || compiled_categories.contains(&key) {
                continue;
            }
            compiled_categories.push(key);

            let values: Vec<&str> = parameters.values(key).collect();
            if let Some(clause) = builder.build(key, &values)? {
                root.push(clause.with_occur(category_occur));
            }
        }

        if let Some(text) = &free_text {
            root.push(Clause::must(self.hybrid_node(text)));
        }
        root.push(Clause::filter(temporal_node(&range)));

        let compiled = CompiledQuery {
            query: QueryNode::Bool(root),
            range,
            pagination: self.pagination(parameters),
            sort: sort_spec(parameters, mode),
            mode,
        };
        debug!(mode = %compiled.mode, "Compiled search parameters");
        Ok(compiled)
    }

    /// A nested tag match or a weighted multi-field match; at least one must hit
    fn hybrid_node(&self, text: &str) -> QueryNode {
        QueryNode::Bool(BoolQuery {
            should: vec![
                QueryNode::nested(NestedPath::Tags, QueryNode::wildcard(IndexField::TagName, text)),
                QueryNode::QueryString {
                    query: text.to_string(),
                    fields: self.free_text_fields.clone(),
                },
            ],
            ..BoolQuery::default()
        })
    }

    fn pagination(&self, parameters: &SearchParameters) -> Pagination {
        let size = max_integer(parameters, ParameterKey::Size)
            .map(|size| size.clamp(0, self.max_size as i64) as usize)
            .unwrap_or(self.default_size);
        let from = max_integer(parameters, ParameterKey::From)
            .map(|from| from.max(0) as usize)
            .unwrap_or(0);
        Pagination { from, size }
    }
}

/// Free-text `query` values joined into one lower-cased string
fn free_text(parameters: &SearchParameters) -> Option<String> {
    let text = parameters
        .values(ParameterKey::Query)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!text.is_empty()).then_some(text)
}

fn temporal_node(range: &TemporalRange) -> QueryNode {
    let created = QueryNode::Range {
        field: IndexField::CreatedDate,
        start: range.start,
        end: range.end,
    };
    if !range.include_events {
        return created;
    }
    let event = QueryNode::nested(
        NestedPath::Events,
        QueryNode::Range {
            field: IndexField::EventInstant,
            start: range.start,
            end: range.end,
        },
    );
    QueryNode::dis_max(vec![created, event])
}

/// Largest integer among the values of `key`; unparsable values are skipped
fn max_integer(parameters: &SearchParameters, key: ParameterKey) -> Option<i64> {
    parameters
        .values(key)
        .filter_map(|value| match value.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(parameter = %key, value = %value, "Ignoring non-numeric value");
                None
            }
        })
        .max()
}

fn sort_spec(parameters: &SearchParameters, mode: SearchMode) -> SortSpec {
    let requested = parameters
        .values(ParameterKey::Sort)
        .map(|value| value.trim().to_ascii_lowercase())
        .find(|value| !value.is_empty());

    match requested {
        Some(value) if value.starts_with("asc") || value.starts_with("up") => {
            SortSpec::CreatedDate(SortOrder::Asc)
        }
        Some(value) if value.starts_with("desc") || value.starts_with("down") => {
            SortSpec::CreatedDate(SortOrder::Desc)
        }
        other => {
            if let Some(value) = other {
                debug!(sort = %value, "Ignoring unknown sort order");
            }
            match mode {
                SearchMode::Structured => SortSpec::CreatedDate(SortOrder::Desc),
                SearchMode::Hybrid => SortSpec::Score,
            }
        }
    }
}
