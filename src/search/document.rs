//! Search document structures and indexing

use crate::models::LogEntry;
use crate::query::terms::MAX_TOKEN_LEN;
use crate::search::error::{IndexResult, SearchError};
use tantivy::schema::*;
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};

/// Tokenizer shared by the title and description fields
pub const TEXT_TOKENIZER: &str = "logbook_text";

/// Separates property name, attribute name and attribute value in one term
pub const PATH_SEPARATOR: char = '\u{1f}';

/// Value of the `exists` field for entries with attachments
pub const HAS_ATTACHMENTS: &str = "attachments";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, fields: &LogFields) -> IndexResult<TantivyDocument>;

    /// Get document ID
    fn document_id(&self) -> Option<i64>;
}

/// Resolved handles of every schema field
#[derive(Debug, Clone, Copy)]
pub struct LogFields {
    pub id: Field,
    pub title: Field,
    pub description: Field,
    pub owner: Field,
    pub level: Field,
    pub tag_name: Field,
    pub logbook_name: Field,
    /// `property SEP attribute SEP value`, one term per attribute
    pub property_path: Field,
    pub attachment_type: Field,
    /// Names of non-empty collections, for "has any" matches
    pub exists: Field,
    /// Milliseconds since the epoch
    pub created_date: Field,
    /// Milliseconds since the epoch, one value per event
    pub event_instant: Field,
    /// Full entry as JSON
    pub document: Field,
}

impl LogFields {
    pub fn from_schema(schema: &Schema) -> IndexResult<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| SearchError::IndexInitFailed(format!("Schema is missing '{}': {}", name, e)))
        };
        Ok(Self {
            id: field("id")?,
            title: field("title")?,
            description: field("description")?,
            owner: field("owner")?,
            level: field("level")?,
            tag_name: field("tag_name")?,
            logbook_name: field("logbook_name")?,
            property_path: field("property_path")?,
            attachment_type: field("attachment_type")?,
            exists: field("exists")?,
            created_date: field("created_date")?,
            event_instant: field("event_instant")?,
            document: field("document")?,
        })
    }
}

/// Build the search schema for log entries
pub fn build_log_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // ID - stored, indexed for updates and deletes
    schema_builder.add_i64_field("id", INDEXED | STORED | FAST);

    // Title and description - analyzed with positions for phrase matching
    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(TEXT_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    schema_builder.add_text_field("title", text_options.clone());
    schema_builder.add_text_field("description", text_options);

    // Keyword fields, lower-cased before indexing
    schema_builder.add_text_field("owner", STRING);
    schema_builder.add_text_field("level", STRING);
    schema_builder.add_text_field("tag_name", STRING);
    schema_builder.add_text_field("logbook_name", STRING);
    schema_builder.add_text_field("property_path", STRING);
    schema_builder.add_text_field("attachment_type", STRING);
    schema_builder.add_text_field("exists", STRING);

    // Timestamps as epoch milliseconds
    schema_builder.add_i64_field("created_date", INDEXED | FAST);
    schema_builder.add_i64_field("event_instant", INDEXED);

    // Full entry, returned with hits
    schema_builder.add_text_field("document", STORED);

    schema_builder.build()
}

/// Register the analyzers the schema refers to
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(
        TEXT_TOKENIZER,
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN + 1))
            .filter(LowerCaser)
            .build(),
    );
}

/// Composite property term; attributes absent means empty segments
pub fn property_path(property: &str, attribute: &str, value: &str) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        property.to_lowercase(),
        attribute.to_lowercase(),
        value.to_lowercase(),
        sep = PATH_SEPARATOR
    )
}

impl SearchDocument for LogEntry {
    fn to_tantivy_doc(&self, fields: &LogFields) -> IndexResult<TantivyDocument> {
        let id = self
            .document_id()
            .ok_or_else(|| SearchError::IndexingFailed("Log entry has no id".to_string()))?;
        let mut doc = TantivyDocument::new();

        doc.add_i64(fields.id, id);
        doc.add_text(fields.title, &self.title);
        doc.add_text(fields.description, &self.description);
        doc.add_text(fields.owner, self.owner.to_lowercase());
        doc.add_text(fields.level, self.level.to_lowercase());

        for tag in &self.tags {
            doc.add_text(fields.tag_name, tag.name.to_lowercase());
        }
        for logbook in &self.logbooks {
            doc.add_text(fields.logbook_name, logbook.name.to_lowercase());
        }

        // Properties (one term per attribute so matches never mix objects)
        for property in &self.properties {
            if property.attributes.is_empty() {
                doc.add_text(fields.property_path, property_path(&property.name, "", ""));
            }
            for attribute in &property.attributes {
                doc.add_text(
                    fields.property_path,
                    property_path(&property.name, &attribute.name, &attribute.value),
                );
            }
        }

        for attachment in &self.attachments {
            doc.add_text(
                fields.attachment_type,
                attachment.file_metadata_description.to_lowercase(),
            );
        }
        if !self.attachments.is_empty() {
            doc.add_text(fields.exists, HAS_ATTACHMENTS);
        }

        doc.add_i64(fields.created_date, self.created_date.timestamp_millis());
        for event in &self.events {
            doc.add_i64(fields.event_instant, event.instant.timestamp_millis());
        }

        let json = serde_json::to_string(self)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to encode entry {}: {}", id, e)))?;
        doc.add_text(fields.document, json);

        Ok(doc)
    }

    fn document_id(&self) -> Option<i64> {
        self.id
    }
}

/// Rebuild the stored entry from a retrieved document
pub fn decode_entry(doc: &TantivyDocument, fields: &LogFields) -> IndexResult<LogEntry> {
    let json = doc
        .get_first(fields.document)
        .and_then(|value| value.as_str())
        .ok_or_else(|| SearchError::DecodingFailed("Document has no stored entry".to_string()))?;
    serde_json::from_str(json).map_err(|e| SearchError::DecodingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, Property};

    #[test]
    fn test_schema_fields_resolve() {
        let schema = build_log_schema();
        assert!(LogFields::from_schema(&schema).is_ok());
    }

    #[test]
    fn test_entry_without_id_is_rejected() {
        let schema = build_log_schema();
        let fields = LogFields::from_schema(&schema).unwrap();
        let entry = LogEntry::new("alice", "t", "d").with_logbook("ops");
        assert!(matches!(
            entry.to_tantivy_doc(&fields),
            Err(SearchError::IndexingFailed(_))
        ));
    }

    #[test]
    fn test_document_round_trip() {
        let schema = build_log_schema();
        let fields = LogFields::from_schema(&schema).unwrap();
        let mut entry = LogEntry::new("Alice", "Beam dump", "The beam was dumped")
            .with_logbook("Operations")
            .with_tag("Beam")
            .with_property(Property::new("shift").with_attribute("lead", "Bob"))
            .with_property(Property::new("empty"))
            .with_attachment(Attachment::new("plot.png", "image/png"));
        entry.id = Some(42);

        let doc = entry.to_tantivy_doc(&fields).unwrap();
        assert_eq!(doc.get_all(fields.property_path).count(), 2);
        assert_eq!(
            doc.get_first(fields.tag_name).and_then(|v| v.as_str()),
            Some("beam")
        );
        assert_eq!(
            doc.get_first(fields.exists).and_then(|v| v.as_str()),
            Some(HAS_ATTACHMENTS)
        );
        assert_eq!(decode_entry(&doc, &fields).unwrap(), entry);
    }

    #[test]
    fn test_property_path() {
        assert_eq!(property_path("PropA", "Attr1", "Val1"), "propa\u{1f}attr1\u{1f}val1");
        assert_eq!(property_path("p", "", ""), "p\u{1f}\u{1f}");
    }
}
