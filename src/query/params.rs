//! Search parameter map and the closed set of recognized keys

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Recognized search parameter categories.
///
/// Parsing is case-insensitive and folds the accepted aliases onto one
/// variant; any other key is not a `ParameterKey` and is ignored by the
/// compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum ParameterKey {
    #[strum(to_string = "text", serialize = "desc", serialize = "description")]
    Text,
    #[strum(to_string = "title")]
    Title,
    #[strum(to_string = "level")]
    Level,
    #[strum(to_string = "owner")]
    Owner,
    #[strum(to_string = "tags")]
    Tags,
    #[strum(to_string = "logbooks")]
    Logbooks,
    #[strum(to_string = "properties")]
    Properties,
    #[strum(to_string = "attachments")]
    Attachments,
    #[strum(to_string = "start")]
    Start,
    #[strum(to_string = "end")]
    End,
    #[strum(to_string = "includeevents", serialize = "includeevent")]
    IncludeEvents,
    #[strum(to_string = "phrase")]
    Phrase,
    #[strum(to_string = "fuzzy")]
    Fuzzy,
    #[strum(to_string = "size", serialize = "limit")]
    Size,
    #[strum(to_string = "from")]
    From,
    #[strum(to_string = "sort")]
    Sort,
    #[strum(to_string = "query")]
    Query,
    #[strum(to_string = "tz")]
    TimeZone,
}

impl ParameterKey {
    /// Classify a raw key, `None` for anything unrecognized
    pub fn classify(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    /// Keys that contribute a matching clause
    pub fn is_category(&self) -> bool {
        matches!(
            self,
            ParameterKey::Text
                | ParameterKey::Title
                | ParameterKey::Level
                | ParameterKey::Owner
                | ParameterKey::Tags
                | ParameterKey::Logbooks
                | ParameterKey::Properties
                | ParameterKey::Attachments
                | ParameterKey::Phrase
        )
    }
}

/// Ordered, case-insensitive, multi-valued parameter map.
///
/// Keys are stored trimmed and lower-cased; inserting an existing key
/// appends to its values. Insertion order of first occurrence is kept so
/// compilation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    entries: Vec<(String, Vec<String>)>,
}

impl SearchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value under `key`
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = normalize_key(key.as_ref());
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Register `key` with no values (e.g. a bare `?includeEvents` flag)
    pub fn insert_flag(&mut self, key: impl AsRef<str>) {
        let key = normalize_key(key.as_ref());
        if !self.entries.iter().any(|(k, _)| *k == key) {
            self.entries.push((key, Vec::new()));
        }
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Values stored under exactly this (case-insensitive) raw key
    pub fn get(&self, key: &str) -> Option<&[String]> {
        let key = normalize_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Whether any raw key classifies as `key`
    pub fn contains(&self, key: ParameterKey) -> bool {
        self.entries
            .iter()
            .any(|(k, _)| ParameterKey::classify(k) == Some(key))
    }

    /// All values of every raw key that classifies as `key`, in order
    pub fn values(&self, key: ParameterKey) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(k, _)| ParameterKey::classify(k) == Some(key))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// Every raw key with its classification
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<ParameterKey>, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), ParameterKey::classify(k), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SearchParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = SearchParameters::new();
        for (key, value) in iter {
            parameters.insert(key, value);
        }
        parameters
    }
}

impl fmt::Display for SearchParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, values)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: [{}]", key, values.join(", "))?;
        }
        write!(f, "}}")
    }
}
