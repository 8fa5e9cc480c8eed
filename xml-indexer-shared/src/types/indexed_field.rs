//! Field types handed to the search index.
//!
//! An `IndexedField` is the on-write unit: a named value plus the metadata the
//! index needs to decide how to store and tokenize it. This crate never
//! tokenizes anything itself; it only assigns an [`AnalyzerCategory`] label.

use serde::{Deserialize, Serialize};

/// Tokenization treatment to apply to a field at index time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerCategory {
    /// Plain text tokenization for display and full-text fields.
    Literal,
    /// Normalized (stemmed) text tokenization.
    Normalized,
    /// The whole value is a single exact-match term.
    ExactKey,
}

impl AnalyzerCategory {
    /// Derive a category from an explicitly configured analyzer name.
    ///
    /// Keyword analyzers map to [`AnalyzerCategory::ExactKey`], stemming
    /// analyzers to [`AnalyzerCategory::Normalized`], anything else is
    /// treated as [`AnalyzerCategory::Literal`].
    pub fn from_analyzer_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("keyword") {
            Self::ExactKey
        } else if lower.contains("stem") || lower.contains("snowball") || lower.contains("porter")
        {
            Self::Normalized
        } else {
            Self::Literal
        }
    }

    /// Label used when reporting the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Normalized => "normalized",
            Self::ExactKey => "exact_key",
        }
    }
}

impl std::fmt::Display for AnalyzerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field of a document as handed to the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedField {
    pub name: String,
    pub value: String,
    /// Whether the raw value is stored for retrieval.
    pub store: bool,
    pub analyzer: AnalyzerCategory,
    /// Generation marker of the indexing pass that wrote this field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl IndexedField {
    /// Create a field that is not yet tagged with a session.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        store: bool,
        analyzer: AnalyzerCategory,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            store,
            analyzer,
            session_id: None,
        }
    }

    /// Stored field tokenized as plain text.
    pub fn stored_text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, true, AnalyzerCategory::Literal)
    }

    /// Unstored field tokenized as plain text.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, false, AnalyzerCategory::Literal)
    }

    /// Unstored field with normalized (stemmed) tokenization.
    pub fn normalized(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, false, AnalyzerCategory::Normalized)
    }

    /// Unstored exact-match field.
    pub fn key(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, false, AnalyzerCategory::ExactKey)
    }

    /// Stored exact-match field.
    pub fn stored_key(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, true, AnalyzerCategory::ExactKey)
    }

    /// Return a copy of this field tagged with the given session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
