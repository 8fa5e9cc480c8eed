//! Request and response types for index-writer operations.

use serde::{Deserialize, Serialize};
use xml_indexer_shared::IndexedField;

/// A complete document as handed to the search index.
///
/// Documents are replaced wholesale on write; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Unique record id, used as the upsert key.
    pub id: String,
    /// Every field of the document, in emission order.
    pub fields: Vec<IndexedField>,
}

impl IndexDocument {
    pub fn new(id: impl Into<String>, fields: Vec<IndexedField>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// All values of a field, in emission order.
    pub fn values<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.as_str())
            .collect()
    }

    /// First value of a field, if present.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Whether any field `name` has exactly `value`.
    pub fn has_term(&self, name: &str, value: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name == name && f.value == value)
    }
}

/// A collection registered with the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection key, for example `dcc`.
    pub key: String,
    /// Native XML format of the collection's records.
    pub format: String,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Free-form text or XML attached to the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_metadata: Option<String>,
}

/// Result of deleting the documents of superseded sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleSessionSummary {
    /// Generation ids whose documents were removed.
    pub sessions_deleted: Vec<String>,
    /// Total number of documents removed.
    pub documents_deleted: usize,
}
