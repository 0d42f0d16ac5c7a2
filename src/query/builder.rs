//! Per-category clause construction

use crate::error::Result;
use crate::query::clause::{BoolQuery, Clause, IndexField, NestedPath, QueryNode};
use crate::query::params::ParameterKey;
use crate::query::terms::{analyze, parse_terms, split_list, SearchTerm};
use tracing::debug;

/// Attachment type tokens matched as a family prefix
const WILDCARD_ATTACHMENT_TYPES: &[&str] = &["image"];

/// Attachment type tokens matched exactly
const EXACT_ATTACHMENT_TYPES: &[&str] = &["plt"];

/// Property addresses use at most `name.attribute.value`
const PROPERTY_SEGMENTS: usize = 3;

/// Builds the required group for one parameter category.
///
/// Every alternative inside a category is optional-match, the category as
/// a whole is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClauseBuilder {
    fuzzy: bool,
}

impl ClauseBuilder {
    pub fn new(fuzzy: bool) -> Self {
        Self { fuzzy }
    }

    /// Build the clause for `category`, `None` when it has nothing to match
    pub fn build(&self, category: ParameterKey, values: &[&str]) -> Result<Option<Clause>> {
        let alternatives = match category {
            ParameterKey::Text => self.text_alternatives(IndexField::Description, values, true)?,
            ParameterKey::Title => self.text_alternatives(IndexField::Title, values, true)?,
            ParameterKey::Level => self.text_alternatives(IndexField::Level, values, false)?,
            ParameterKey::Owner => {
                ClauseBuilder::new(false).text_alternatives(IndexField::Owner, values, false)?
            }
            ParameterKey::Tags => {
                return Ok(nested_names(NestedPath::Tags, IndexField::TagName, values));
            }
            ParameterKey::Logbooks => {
                return Ok(nested_names(NestedPath::Logbooks, IndexField::LogbookName, values));
            }
            ParameterKey::Properties => property_alternatives(values),
            ParameterKey::Attachments => attachment_alternatives(values),
            ParameterKey::Phrase => values
                .iter()
                .filter_map(|value| phrase_node(IndexField::Description, value))
                .collect(),
            other => {
                debug!(key = %other, "Parameter does not select a clause");
                Vec::new()
            }
        };

        Ok(required_group(alternatives))
    }

    /// Terms of free-text categories: quoted terms match literally, others by
    /// fuzzy or wildcard match depending on the `fuzzy` flag
    fn text_alternatives(
        &self,
        field: IndexField,
        values: &[&str],
        analyzed: bool,
    ) -> Result<Vec<QueryNode>> {
        let mut alternatives = Vec::new();
        for value in values {
            for term in parse_terms(value)? {
                if let Some(node) = self.term_node(field, &term, analyzed) {
                    alternatives.push(node);
                }
            }
        }
        Ok(alternatives)
    }

    fn term_node(&self, field: IndexField, term: &SearchTerm, analyzed: bool) -> Option<QueryNode> {
        if term.is_phrase() {
            if analyzed {
                return phrase_node(field, term.phrase_text());
            }
            let literal = term.phrase_text().trim().to_lowercase();
            return (!literal.is_empty()).then(|| QueryNode::term(field, literal));
        }
        if self.fuzzy {
            Some(QueryNode::Fuzzy {
                field,
                value: term.as_str().to_string(),
            })
        } else {
            Some(QueryNode::wildcard(field, term.as_str()))
        }
    }
}

/// Ordered phrase over the analyzed tokens of `text`; one token is a plain
/// term match and no tokens match nothing
fn phrase_node(field: IndexField, text: &str) -> Option<QueryNode> {
    let tokens = analyze(text);
    match tokens.len() {
        0 => None,
        1 => tokens.into_iter().next().map(|token| QueryNode::term(field, token)),
        _ => Some(QueryNode::Phrase {
            field,
            phrase: tokens.join(" "),
        }),
    }
}

fn nested_names(path: NestedPath, field: IndexField, values: &[&str]) -> Option<Clause> {
    let alternatives: Vec<QueryNode> = values
        .iter()
        .flat_map(|value| split_list(value))
        .map(|name| QueryNode::wildcard(field, name))
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    Some(Clause::must(QueryNode::nested(
        path,
        QueryNode::dis_max(alternatives),
    )))
}

/// `name[.attribute[.value]]`; further segments are ignored
fn property_alternatives(values: &[&str]) -> Vec<QueryNode> {
    values
        .iter()
        .flat_map(|value| split_list(value))
        .filter_map(|address| {
            let segments: Vec<&str> = address.split('.').take(PROPERTY_SEGMENTS).collect();
            property_node(&segments)
        })
        .collect()
}

fn property_node(segments: &[&str]) -> Option<QueryNode> {
    let (name, rest) = segments.split_first()?;
    if name.is_empty() {
        return None;
    }
    let name_match = QueryNode::wildcard(IndexField::PropertyName, *name);

    let Some((attribute, value)) = rest.split_first().filter(|(attribute, _)| !attribute.is_empty())
    else {
        return Some(QueryNode::nested(NestedPath::Properties, name_match));
    };

    let mut attribute_match = BoolQuery::new()
        .with(Clause::must(QueryNode::wildcard(IndexField::AttributeName, *attribute)));
    if let Some(value) = value.first().filter(|value| !value.is_empty()) {
        attribute_match.push(Clause::must(QueryNode::wildcard(IndexField::AttributeValue, *value)));
    }

    let property_match = BoolQuery::new()
        .with(Clause::must(name_match))
        .with(Clause::must(QueryNode::nested(
            NestedPath::PropertyAttributes,
            QueryNode::Bool(attribute_match),
        )));
    Some(QueryNode::nested(NestedPath::Properties, QueryNode::Bool(property_match)))
}

/// No value (or `null`) asks for any attachment; otherwise known type
/// families are matched and unknown ones dropped
fn attachment_alternatives(values: &[&str]) -> Vec<QueryNode> {
    let any_attachment = QueryNode::Exists {
        field: IndexField::Attachments,
    };
    if values.is_empty() {
        return vec![any_attachment];
    }

    let mut alternatives = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("null") {
            if !alternatives.contains(&any_attachment) {
                alternatives.push(any_attachment.clone());
            }
            continue;
        }
        for kind in split_list(value) {
            if WILDCARD_ATTACHMENT_TYPES.contains(&kind.as_str()) {
                alternatives.push(QueryNode::wildcard(IndexField::AttachmentType, format!("{}*", kind)));
            } else if EXACT_ATTACHMENT_TYPES.contains(&kind.as_str()) {
                alternatives.push(QueryNode::term(IndexField::AttachmentType, kind));
            } else {
                debug!(attachment_type = %kind, "Ignoring unknown attachment type");
            }
        }
    }
    alternatives
}

fn required_group(alternatives: Vec<QueryNode>) -> Option<Clause> {
    if alternatives.is_empty() {
        None
    } else {
        Some(Clause::must(QueryNode::dis_max(alternatives)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogbookError;
    use crate::query::clause::Occur;

    fn build(category: ParameterKey, values: &[&str]) -> Option<Clause> {
        ClauseBuilder::new(false).build(category, values).unwrap()
    }

    fn alternatives(clause: Clause) -> Vec<QueryNode> {
        match clause.node {
            QueryNode::DisMax { queries } => queries,
            QueryNode::Nested { query, .. } => match *query {
                QueryNode::DisMax { queries } => queries,
                other => panic!("expected dismax, got {:?}", other),
            },
            other => panic!("expected dismax, got {:?}", other),
        }
    }

    #[test]
    fn test_single_value_single_alternative() {
        let clause = build(ParameterKey::Text, &["quick"]).unwrap();
        assert_eq!(clause.occur, Occur::Must);
        assert_eq!(
            alternatives(clause),
            vec![QueryNode::wildcard(IndexField::Description, "quick")]
        );
    }

    #[test]
    fn test_empty_values_contribute_nothing() {
        assert!(build(ParameterKey::Text, &[]).is_none());
        assert!(build(ParameterKey::Title, &["", " , "]).is_none());
        assert!(build(ParameterKey::Tags, &[""]).is_none());
        assert!(build(ParameterKey::Properties, &[]).is_none());
    }

    #[test]
    fn test_wildcards_are_not_added() {
        let clause = build(ParameterKey::Owner, &["Alice"]).unwrap();
        assert_eq!(
            alternatives(clause),
            vec![QueryNode::wildcard(IndexField::Owner, "alice")]
        );
    }

    #[test]
    fn test_fuzzy_flag() {
        let clause = ClauseBuilder::new(true)
            .build(ParameterKey::Text, &["quikc brwn"])
            .unwrap()
            .unwrap();
        let queries = alternatives(clause);
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| matches!(q, QueryNode::Fuzzy { .. })));

        // owner never goes fuzzy
        let owner = ClauseBuilder::new(true)
            .build(ParameterKey::Owner, &["alice"])
            .unwrap()
            .unwrap();
        assert!(matches!(alternatives(owner)[0], QueryNode::Wildcard { .. }));
    }

    #[test]
    fn test_quoted_terms() {
        let clause = build(ParameterKey::Title, &["\"Beam Dump\" magnet"]).unwrap();
        assert_eq!(
            alternatives(clause),
            vec![
                QueryNode::Phrase {
                    field: IndexField::Title,
                    phrase: "beam dump".to_string()
                },
                QueryNode::wildcard(IndexField::Title, "magnet"),
            ]
        );

        let level = build(ParameterKey::Level, &["\"Problem\""]).unwrap();
        assert_eq!(alternatives(level), vec![QueryNode::term(IndexField::Level, "problem")]);
    }

    #[test]
    fn test_unbalanced_quote_fails() {
        let err = ClauseBuilder::new(false)
            .build(ParameterKey::Text, &["\"open"])
            .unwrap_err();
        assert!(matches!(err, LogbookError::MalformedQuery(_)));
    }

    #[test]
    fn test_tags_are_nested() {
        let clause = build(ParameterKey::Tags, &["testTag*|other"]).unwrap();
        match &clause.node {
            QueryNode::Nested { path, .. } => assert_eq!(*path, NestedPath::Tags),
            other => panic!("expected nested, got {:?}", other),
        }
        assert_eq!(
            alternatives(clause),
            vec![
                QueryNode::wildcard(IndexField::TagName, "testtag*"),
                QueryNode::wildcard(IndexField::TagName, "other"),
            ]
        );
    }

    #[test]
    fn test_property_addressing() {
        let clause = build(ParameterKey::Properties, &["propA.attr1.val1.extra"]).unwrap();
        let expected = QueryNode::nested(
            NestedPath::Properties,
            QueryNode::Bool(
                BoolQuery::new()
                    .with(Clause::must(QueryNode::wildcard(IndexField::PropertyName, "propa")))
                    .with(Clause::must(QueryNode::nested(
                        NestedPath::PropertyAttributes,
                        QueryNode::Bool(
                            BoolQuery::new()
                                .with(Clause::must(QueryNode::wildcard(IndexField::AttributeName, "attr1")))
                                .with(Clause::must(QueryNode::wildcard(IndexField::AttributeValue, "val1"))),
                        ),
                    ))),
            ),
        );
        assert_eq!(alternatives(clause), vec![expected]);

        let name_only = build(ParameterKey::Properties, &["propA"]).unwrap();
        assert_eq!(
            alternatives(name_only),
            vec![QueryNode::nested(
                NestedPath::Properties,
                QueryNode::wildcard(IndexField::PropertyName, "propa")
            )]
        );
    }

    #[test]
    fn test_attachments() {
        let any = build(ParameterKey::Attachments, &[]).unwrap();
        assert_eq!(
            alternatives(any),
            vec![QueryNode::Exists {
                field: IndexField::Attachments
            }]
        );

        let null = build(ParameterKey::Attachments, &["null"]).unwrap();
        assert!(matches!(alternatives(null)[0], QueryNode::Exists { .. }));

        let typed = build(ParameterKey::Attachments, &["image,plt,spreadsheet"]).unwrap();
        assert_eq!(
            alternatives(typed),
            vec![
                QueryNode::wildcard(IndexField::AttachmentType, "image*"),
                QueryNode::term(IndexField::AttachmentType, "plt"),
            ]
        );

        assert!(build(ParameterKey::Attachments, &["spreadsheet"]).is_none());
    }

    #[test]
    fn test_phrase_category() {
        let clause = build(ParameterKey::Phrase, &["Quick Brown", "fox"]).unwrap();
        assert_eq!(
            alternatives(clause),
            vec![
                QueryNode::Phrase {
                    field: IndexField::Description,
                    phrase: "quick brown".to_string()
                },
                QueryNode::term(IndexField::Description, "fox"),
            ]
        );
    }

    #[test]
    fn test_non_category_keys() {
        assert!(build(ParameterKey::Size, &["10"]).is_none());
        assert!(build(ParameterKey::Sort, &["asc"]).is_none());
    }
}
