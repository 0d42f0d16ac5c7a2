//! Index-independent query tree produced by the compiler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// How a clause takes part in its enclosing boolean group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Occur {
    /// Required, contributes to relevance
    Must,
    /// Optional, contributes to relevance
    Should,
    /// Required, no relevance contribution
    Filter,
}

/// Indexed field a leaf query targets, named by its document path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum IndexField {
    #[serde(rename = "title")]
    #[strum(serialize = "title")]
    Title,
    #[serde(rename = "description")]
    #[strum(serialize = "description")]
    Description,
    #[serde(rename = "owner")]
    #[strum(serialize = "owner")]
    Owner,
    #[serde(rename = "level")]
    #[strum(serialize = "level")]
    Level,
    #[serde(rename = "tags.name")]
    #[strum(serialize = "tags.name")]
    TagName,
    #[serde(rename = "logbooks.name")]
    #[strum(serialize = "logbooks.name")]
    LogbookName,
    #[serde(rename = "properties.name")]
    #[strum(serialize = "properties.name")]
    PropertyName,
    #[serde(rename = "properties.attributes.name")]
    #[strum(serialize = "properties.attributes.name")]
    AttributeName,
    #[serde(rename = "properties.attributes.value")]
    #[strum(serialize = "properties.attributes.value")]
    AttributeValue,
    #[serde(rename = "attachments")]
    #[strum(serialize = "attachments")]
    Attachments,
    #[serde(rename = "attachments.fileMetadataDescription")]
    #[strum(serialize = "attachments.fileMetadataDescription")]
    AttachmentType,
    #[serde(rename = "createdDate")]
    #[strum(serialize = "createdDate")]
    CreatedDate,
    #[serde(rename = "events.instant")]
    #[strum(serialize = "events.instant")]
    EventInstant,
}

/// One-to-many embedded object collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum NestedPath {
    #[serde(rename = "tags")]
    #[strum(serialize = "tags")]
    Tags,
    #[serde(rename = "logbooks")]
    #[strum(serialize = "logbooks")]
    Logbooks,
    #[serde(rename = "properties")]
    #[strum(serialize = "properties")]
    Properties,
    #[serde(rename = "properties.attributes")]
    #[strum(serialize = "properties.attributes")]
    PropertyAttributes,
    #[serde(rename = "events")]
    #[strum(serialize = "events")]
    Events,
}

/// A field with its free-text relevance weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostedField {
    pub field: IndexField,
    pub boost: f32,
}

/// Query tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    /// Case-insensitive glob match (`*`, `?`)
    Wildcard { field: IndexField, pattern: String },
    /// Exact match of a single lower-cased token
    Term { field: IndexField, value: String },
    /// Edit-distance match of a single lower-cased token
    Fuzzy { field: IndexField, value: String },
    /// Ordered match of consecutive tokens
    Phrase { field: IndexField, phrase: String },
    /// Inclusive instant range
    Range {
        field: IndexField,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Field holds at least one value
    Exists { field: IndexField },
    /// Free-text query string across weighted fields
    QueryString {
        query: String,
        fields: Vec<BoostedField>,
    },
    /// Match against the objects of one embedded collection
    Nested { path: NestedPath, query: Box<QueryNode> },
    /// Best-scoring alternative; matches if any alternative matches
    DisMax { queries: Vec<QueryNode> },
    Bool(BoolQuery),
}

impl QueryNode {
    pub fn wildcard(field: IndexField, pattern: impl Into<String>) -> Self {
        QueryNode::Wildcard {
            field,
            pattern: pattern.into(),
        }
    }

    pub fn term(field: IndexField, value: impl Into<String>) -> Self {
        QueryNode::Term {
            field,
            value: value.into(),
        }
    }

    pub fn nested(path: NestedPath, query: QueryNode) -> Self {
        QueryNode::Nested {
            path,
            query: Box::new(query),
        }
    }

    pub fn dis_max(queries: Vec<QueryNode>) -> Self {
        QueryNode::DisMax { queries }
    }
}

/// Boolean group.
///
/// A group with only `should` clauses requires at least one of them to match;
/// once any `must` or `filter` clause is present, `should` clauses only add
/// to relevance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default)]
    pub must: Vec<QueryNode>,
    #[serde(default)]
    pub should: Vec<QueryNode>,
    #[serde(default)]
    pub filter: Vec<QueryNode>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        match clause.occur {
            Occur::Must => self.must.push(clause.node),
            Occur::Should => self.should.push(clause.node),
            Occur::Filter => self.filter.push(clause.node),
        }
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.push(clause);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.filter.is_empty()
    }
}

/// A query node tagged with how it participates in its parent group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub occur: Occur,
    pub node: QueryNode,
}

impl Clause {
    pub fn must(node: QueryNode) -> Self {
        Self {
            occur: Occur::Must,
            node,
        }
    }

    pub fn should(node: QueryNode) -> Self {
        Self {
            occur: Occur::Should,
            node,
        }
    }

    pub fn filter(node: QueryNode) -> Self {
        Self {
            occur: Occur::Filter,
            node,
        }
    }

    /// Same node, different occurrence
    pub fn with_occur(self, occur: Occur) -> Self {
        Self { occur, ..self }
    }
}
