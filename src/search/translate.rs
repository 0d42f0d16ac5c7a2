//! Translation of compiled query trees into Tantivy queries

use crate::query::{BoolQuery, IndexField, NestedPath, QueryNode};
use crate::search::document::{LogFields, HAS_ATTACHMENTS};
use crate::search::error::{IndexResult, SearchError};
use std::ops::Bound;
use tantivy::query::{
    AllQuery, BooleanQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery, FuzzyTermQuery,
    Occur, PhraseQuery, Query, QueryParser, RangeQuery, RegexQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};

/// Matches any run of characters inside one property path segment
const ANY_IN_SEGMENT: &str = r"[^\x1F]*";
const ONE_IN_SEGMENT: &str = r"[^\x1F]";
const SEGMENT_SEPARATOR: &str = r"\x1F";

/// Converts [`QueryNode`] trees into Tantivy queries over the log schema
pub struct QueryTranslator {
    index: Index,
    fields: LogFields,
}

/// Regex per property path segment; `None` matches any segment
#[derive(Debug, Default)]
struct PropertyPattern {
    name: Option<String>,
    attribute: Option<String>,
    value: Option<String>,
}

impl QueryTranslator {
    pub fn new(index: Index, fields: LogFields) -> Self {
        Self { index, fields }
    }

    /// Translate a query tree
    pub fn translate(&self, node: &QueryNode) -> IndexResult<Box<dyn Query>> {
        match node {
            QueryNode::Wildcard { field, pattern } => {
                let (field, _) = self.field(*field)?;
                let regex = wildcard_regex(pattern, ".*", ".");
                Ok(Box::new(pattern_query(&regex, field)?))
            }
            QueryNode::Term { field, value } => {
                let (field, _) = self.field(*field)?;
                Ok(Box::new(TermQuery::new(
                    Term::from_field_text(field, value),
                    IndexRecordOption::WithFreqs,
                )))
            }
            QueryNode::Fuzzy { field, value } => {
                let (field, _) = self.field(*field)?;
                Ok(Box::new(FuzzyTermQuery::new(
                    Term::from_field_text(field, value),
                    fuzzy_distance(value),
                    true,
                )))
            }
            QueryNode::Phrase { field, phrase } => {
                let (field, _) = self.field(*field)?;
                let mut terms: Vec<Term> = phrase
                    .split_whitespace()
                    .map(|token| Term::from_field_text(field, token))
                    .collect();
                let query: Box<dyn Query> = match terms.len() {
                    0 => Box::new(EmptyQuery),
                    1 => Box::new(TermQuery::new(terms.remove(0), IndexRecordOption::WithFreqs)),
                    _ => Box::new(PhraseQuery::new(terms)),
                };
                Ok(query)
            }
            QueryNode::Range { field, start, end } => {
                let (_, name) = self.field(*field)?;
                Ok(Box::new(RangeQuery::new_i64_bounds(
                    name.to_string(),
                    Bound::Included(start.timestamp_millis()),
                    Bound::Included(end.timestamp_millis()),
                )))
            }
            QueryNode::Exists { field } => match field {
                IndexField::Attachments => Ok(Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.exists, HAS_ATTACHMENTS),
                    IndexRecordOption::Basic,
                ))),
                other => Err(SearchError::SearchFailed(format!(
                    "Existence match is not supported on '{}'",
                    other
                ))),
            },
            QueryNode::QueryString { query, fields } => {
                let mut targets = Vec::with_capacity(fields.len());
                for boosted in fields {
                    targets.push((self.field(boosted.field)?.0, boosted.boost));
                }
                let mut parser =
                    QueryParser::for_index(&self.index, targets.iter().map(|(f, _)| *f).collect());
                for (field, boost) in targets {
                    parser.set_field_boost(field, boost);
                }
                Ok(parser.parse_query(query)?)
            }
            QueryNode::Nested { path, query } => match path {
                NestedPath::Properties => self.property_query(query),
                // One field per object, so flattened terms keep object boundaries
                NestedPath::Tags | NestedPath::Logbooks | NestedPath::Events => self.translate(query),
                NestedPath::PropertyAttributes => Err(SearchError::SearchFailed(
                    "Attribute match outside of a property match".to_string(),
                )),
            },
            QueryNode::DisMax { queries } => {
                if queries.is_empty() {
                    return Ok(Box::new(EmptyQuery));
                }
                let subqueries = queries
                    .iter()
                    .map(|q| self.translate(q))
                    .collect::<IndexResult<Vec<_>>>()?;
                Ok(Box::new(DisjunctionMaxQuery::new(subqueries)))
            }
            QueryNode::Bool(group) => self.bool_query(group),
        }
    }

    fn bool_query(&self, group: &BoolQuery) -> IndexResult<Box<dyn Query>> {
        if group.is_empty() {
            return Ok(Box::new(AllQuery));
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for node in &group.must {
            subqueries.push((Occur::Must, self.translate(node)?));
        }
        for node in &group.should {
            subqueries.push((Occur::Should, self.translate(node)?));
        }
        // Filters are required but leave the score alone
        for node in &group.filter {
            subqueries.push((
                Occur::Must,
                Box::new(ConstScoreQuery::new(self.translate(node)?, 0.0)),
            ));
        }
        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    /// A property match becomes one regex over `name SEP attribute SEP value`
    /// terms, so all three parts must come from the same attribute
    fn property_query(&self, node: &QueryNode) -> IndexResult<Box<dyn Query>> {
        let mut pattern = PropertyPattern::default();
        collect_property_pattern(node, &mut pattern)?;

        let any = ANY_IN_SEGMENT.to_string();
        let regex = [
            pattern.name.unwrap_or_else(|| any.clone()),
            pattern.attribute.unwrap_or_else(|| any.clone()),
            pattern.value.unwrap_or(any),
        ]
        .join(SEGMENT_SEPARATOR);
        Ok(Box::new(pattern_query(&regex, self.fields.property_path)?))
    }

    /// Schema field and its name for a query field
    fn field(&self, field: IndexField) -> IndexResult<(Field, &'static str)> {
        let resolved = match field {
            IndexField::Title => (self.fields.title, "title"),
            IndexField::Description => (self.fields.description, "description"),
            IndexField::Owner => (self.fields.owner, "owner"),
            IndexField::Level => (self.fields.level, "level"),
            IndexField::TagName => (self.fields.tag_name, "tag_name"),
            IndexField::LogbookName => (self.fields.logbook_name, "logbook_name"),
            IndexField::AttachmentType => (self.fields.attachment_type, "attachment_type"),
            IndexField::Attachments => (self.fields.exists, "exists"),
            IndexField::CreatedDate => (self.fields.created_date, "created_date"),
            IndexField::EventInstant => (self.fields.event_instant, "event_instant"),
            IndexField::PropertyName | IndexField::AttributeName | IndexField::AttributeValue => {
                return Err(SearchError::SearchFailed(format!(
                    "'{}' can only be matched inside a property match",
                    field
                )));
            }
        };
        Ok(resolved)
    }
}

fn collect_property_pattern(node: &QueryNode, pattern: &mut PropertyPattern) -> IndexResult<()> {
    let (field, regex) = match node {
        QueryNode::Wildcard { field, pattern: glob } => {
            (*field, wildcard_regex(glob, ANY_IN_SEGMENT, ONE_IN_SEGMENT))
        }
        QueryNode::Term { field, value } => (*field, regex::escape(value)),
        QueryNode::Bool(group) if group.should.is_empty() => {
            for child in group.must.iter().chain(&group.filter) {
                collect_property_pattern(child, pattern)?;
            }
            return Ok(());
        }
        QueryNode::Nested {
            path: NestedPath::PropertyAttributes,
            query,
        } => return collect_property_pattern(query, pattern),
        other => {
            return Err(SearchError::SearchFailed(format!(
                "Unsupported property match: {:?}",
                other
            )));
        }
    };

    let slot = match field {
        IndexField::PropertyName => &mut pattern.name,
        IndexField::AttributeName => &mut pattern.attribute,
        IndexField::AttributeValue => &mut pattern.value,
        other => {
            return Err(SearchError::SearchFailed(format!(
                "'{}' is not a property field",
                other
            )));
        }
    };
    *slot = Some(regex);
    Ok(())
}

/// Regex query over `field`; a pattern the automaton cannot hold is a
/// problem with the query, not with the index
fn pattern_query(regex: &str, field: Field) -> IndexResult<RegexQuery> {
    RegexQuery::from_pattern(regex, field).map_err(|e| {
        SearchError::QueryParsingFailed(format!("Unsupported match pattern: {}", e))
    })
}

/// Glob to regex: `*` and `?` become `any`/`one`, everything else literal
fn wildcard_regex(pattern: &str, any: &str, one: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if c == '*' { any } else { one });
            }
            _ => literal.push(c),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex
}

/// Edit distance allowed for a fuzzy term, growing with its length
fn fuzzy_distance(value: &str) -> u8 {
    match value.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}
