//! Splitting raw parameter values into search terms

use crate::error::{LogbookError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens longer than this (in bytes) are dropped by the text analyzer
pub const MAX_TOKEN_LEN: usize = 40;

/// A normalized search term.
///
/// Unquoted terms are lower-cased. A term wrapped in double quotes keeps its
/// quotes and original casing and is never split further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the term is a quoted literal phrase
    pub fn is_phrase(&self) -> bool {
        self.0.len() >= 2 && self.0.starts_with('"') && self.0.ends_with('"')
    }

    /// The term without surrounding quotes
    pub fn phrase_text(&self) -> &str {
        if self.is_phrase() {
            &self.0[1..self.0.len() - 1]
        } else {
            &self.0
        }
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SearchTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_term_delimiter(c: char) -> bool {
    c == ',' || c == ';' || c == '|' || c.is_whitespace()
}

/// Split `raw` on whitespace, commas, semicolons and pipes.
///
/// Empty segments are skipped and an opened but unclosed quote is rejected.
/// A quoted segment becomes its own term, even inside a word: the text around
/// it is joined, so `foo"bar baz"qux` gives `"bar baz"` and `fooqux`.
pub fn parse_terms(raw: &str) -> Result<Vec<SearchTerm>> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut phrase = String::new();
    let mut quoted = false;

    for c in raw.chars() {
        if c == '"' {
            phrase.push(c);
            if quoted {
                terms.push(SearchTerm(std::mem::take(&mut phrase)));
            }
            quoted = !quoted;
        } else if quoted {
            phrase.push(c);
        } else if is_term_delimiter(c) {
            if !current.is_empty() {
                terms.push(SearchTerm(std::mem::take(&mut current)));
            }
        } else {
            current.extend(c.to_lowercase());
        }
    }

    if quoted {
        return Err(LogbookError::MalformedQuery(format!(
            "unbalanced quotes in search term: {}",
            raw
        )));
    }
    if !current.is_empty() {
        terms.push(SearchTerm(current));
    }
    Ok(terms)
}

/// Split a name list (tags, logbooks, properties, attachment types) on
/// `|`, `,` and `;`, trimming and lower-casing each entry.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(['|', ',', ';'])
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Tokenize free text the way the description and title fields are indexed:
/// alphanumeric runs, lower-cased, over-long tokens dropped.
pub fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && token.len() <= MAX_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}
