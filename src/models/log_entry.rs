use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// A single logbook entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Sequence identifier, assigned once on creation
    pub id: Option<i64>,

    /// Author of the entry
    pub owner: String,

    /// Raw source text the description was rendered from
    #[serde(default)]
    pub source: String,

    /// Entry body
    #[serde(default)]
    pub description: String,

    /// Human-readable title
    #[validate(length(min = 1, message = "a log entry must have a title"))]
    pub title: String,

    /// Free-form level such as "Info" or "Problem"
    #[serde(default = "default_level")]
    pub level: String,

    /// Whether the entry is current
    #[serde(default)]
    pub state: State,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,

    /// Last modification timestamp
    #[serde(default)]
    pub modify_date: Option<DateTime<Utc>>,

    /// Timed events the entry refers to
    #[serde(default)]
    pub events: Vec<Event>,

    /// Logbooks the entry is filed in
    #[validate(length(min = 1, message = "a log entry must be filed in at least one logbook"))]
    #[serde(default)]
    pub logbooks: Vec<Logbook>,

    /// Tags
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Structured properties
    #[serde(default)]
    pub properties: Vec<Property>,

    /// Attachment metadata
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl LogEntry {
    /// Create a new, unidentified entry
    pub fn new(owner: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: None,
            owner: owner.into(),
            source: description.clone(),
            description,
            title: title.into(),
            level: default_level(),
            state: State::Active,
            created_date: Utc::now(),
            modify_date: None,
            events: Vec::new(),
            logbooks: Vec::new(),
            tags: Vec::new(),
            properties: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_created_date(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = created_date;
        self
    }

    pub fn with_logbook(mut self, name: impl Into<String>) -> Self {
        self.logbooks.push(Logbook::new(name));
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name));
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_event(mut self, name: impl Into<String>, instant: DateTime<Utc>) -> Self {
        self.events.push(Event {
            name: name.into(),
            instant,
        });
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Lifecycle state shared by entries and their associated objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum State {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub state: State,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: State::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logbook {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub state: State,
}

impl Logbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            state: State::Active,
        }
    }
}

/// Named group of key/value attributes attached to an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            state: State::Active,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
            state: State::Active,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub state: State,
}

/// A named instant the entry refers to, e.g. a beam trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub instant: DateTime<Utc>,
}

/// Attachment metadata; the bytes live elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub filename: String,
    /// MIME type (`image/png`) or coarse type token (`plt`)
    pub file_metadata_description: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, file_metadata_description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            file_metadata_description: file_metadata_description.into(),
        }
    }
}

/// Result of a search: total matches plus the requested window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hit_count: u64,
    pub logs: Vec<LogEntry>,
}

fn default_level() -> String {
    "Info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_validation() {
        let entry = LogEntry::new("operator", "Beam dump", "Beam dumped at 12:00").with_logbook("operations");
        assert!(entry.validate().is_ok());

        let untitled = LogEntry::new("operator", "", "body").with_logbook("operations");
        assert!(untitled.validate().is_err());

        let unfiled = LogEntry::new("operator", "Beam dump", "body");
        assert!(unfiled.validate().is_err());
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("active".parse::<State>().unwrap(), State::Active);
        assert_eq!("INACTIVE".parse::<State>().unwrap(), State::Inactive);
        assert_eq!(State::Active.to_string(), "Active");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = LogEntry::new("operator", "t", "d")
            .with_logbook("ops")
            .with_attachment(Attachment::new("plot.png", "image/png"));
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("createdDate").is_some());
        assert_eq!(
            json["attachments"][0]["fileMetadataDescription"],
            serde_json::json!("image/png")
        );
    }

    #[test]
    fn test_entry_survives_bincode() {
        let entry = LogEntry::new("operator", "t", "d")
            .with_logbook("ops")
            .with_property(Property::new("shift").with_attribute("lead", "alice"));
        let bytes = bincode::serialize(&entry).unwrap();
        let decoded: LogEntry = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }
}
