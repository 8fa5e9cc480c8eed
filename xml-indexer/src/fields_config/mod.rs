//! Per-format and per-schema field extraction rules.
//!
//! Rules are loaded from an index document that lists one configuration file
//! per format or schema. Each file declares:
//!
//! - custom fields, emitted under their own name with a configured store flag
//!   and analyzer category
//! - standard-role fields (id, url, title, description, bounding-box corners)
//! - relationships, whose hits are classified as ids or urls
//!
//! Once loaded, a [`FieldExtractionConfigs`] set is read-only. Hot reload swaps
//! the whole set through [`SharedFieldsConfig`].

mod loader;
mod shared;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;
use xml_indexer_shared::AnalyzerCategory;

use crate::errors::ConfigError;
use crate::xpath::{XPath, XPathError};

pub use shared::SharedFieldsConfig;

/// A rule's path expression, compiled when the rule was loaded.
///
/// A malformed expression does not fail the configuration file; it surfaces
/// as an extraction error for that rule when the rule is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleXPath {
    source: String,
    compiled: Result<XPath, XPathError>,
}

impl RuleXPath {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = XPath::compile(&source);
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compiled(&self) -> Result<&XPath, XPathError> {
        self.compiled.as_ref().map_err(Clone::clone)
    }
}

/// A field emitted under its own name.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFieldRule {
    pub name: String,
    pub xpaths: Vec<RuleXPath>,
    pub store: bool,
    pub analyzer: AnalyzerCategory,
}

/// Semantic roles the extractor knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardRole {
    Id,
    Url,
    Title,
    Description,
    North,
    South,
    East,
    West,
}

impl StandardRole {
    /// Parse a role name as written in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "url" => Some(Self::Url),
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "geoBBNorth" => Some(Self::North),
            "geoBBSouth" => Some(Self::South),
            "geoBBEast" => Some(Self::East),
            "geoBBWest" => Some(Self::West),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Url => "url",
            Self::Title => "title",
            Self::Description => "description",
            Self::North => "geoBBNorth",
            Self::South => "geoBBSouth",
            Self::East => "geoBBEast",
            Self::West => "geoBBWest",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardFieldRule {
    pub role: StandardRole,
    pub xpaths: Vec<RuleXPath>,
}

/// How a relationship hit is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Id,
    Url,
}

impl RelationKind {
    /// Parse a kind, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("id") {
            Some(Self::Id)
        } else if name.eq_ignore_ascii_case("url") {
            Some(Self::Url)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPath {
    pub xpath: RuleXPath,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRule {
    pub name: String,
    pub xpaths: Vec<RelationshipPath>,
}

/// The rules for one format or schema key, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtractionConfig {
    pub custom_fields: Vec<CustomFieldRule>,
    pub standard_fields: Vec<StandardFieldRule>,
    pub relationships: Vec<RelationshipRule>,
}

/// Every loaded configuration, keyed by format or schema.
#[derive(Debug, Clone, Default)]
pub struct FieldExtractionConfigs {
    configs: HashMap<String, Arc<FieldExtractionConfig>>,
    analyzers: BTreeMap<String, AnalyzerCategory>,
    load_errors: Vec<ConfigError>,
}

impl FieldExtractionConfigs {
    /// An empty set: every record is extracted in generic-only mode.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules for a format or schema key.
    pub fn get_config(&self, key: &str) -> Option<&FieldExtractionConfig> {
        self.configs.get(key).map(Arc::as_ref)
    }

    pub fn is_configured(&self, key: &str) -> bool {
        self.configs.contains_key(key)
    }

    /// Configured keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.configs.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Analyzer category of every custom field, by field name.
    pub fn analyzer_map(&self) -> &BTreeMap<String, AnalyzerCategory> {
        &self.analyzers
    }

    /// Files that failed to load.
    pub fn load_errors(&self) -> &[ConfigError] {
        &self.load_errors
    }

    /// Register a configuration under a key, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, config: FieldExtractionConfig) {
        let key = key.into();
        for field in &config.custom_fields {
            self.record_analyzer(&key, field);
        }
        if self.configs.insert(key.clone(), Arc::new(config)).is_some() {
            warn!(key = %key, "Field configuration replaced by a later file");
        }
    }

    fn record_analyzer(&mut self, key: &str, field: &CustomFieldRule) {
        match self.analyzers.get(&field.name) {
            Some(existing) if *existing != field.analyzer => {
                warn!(
                    field = %field.name,
                    key = %key,
                    kept = %existing,
                    ignored = %field.analyzer,
                    "Conflicting analyzer for custom field"
                );
            }
            Some(_) => {}
            None => {
                self.analyzers.insert(field.name.clone(), field.analyzer);
            }
        }
    }

    pub(crate) fn push_load_error(&mut self, error: ConfigError) {
        self.load_errors.push(error);
    }
}
