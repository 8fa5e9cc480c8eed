//! Error types for the XML indexer.

use thiserror::Error;
use xml_indexer_repository::SearchIndexError;

use crate::xpath::XPathError;

/// A configuration file could not be loaded.
///
/// Raised per file: other configuration files keep loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Unable to read configuration file '{path}': {message}")]
    Read { path: String, message: String },

    /// The file is not well-formed XML.
    #[error("Configuration file '{path}' is not well-formed: {message}")]
    Parse { path: String, message: String },

    /// A rule in the file is malformed.
    #[error("Invalid configuration in '{path}': {message}")]
    InvalidRule { path: String, message: String },
}

impl ConfigError {
    pub fn read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_rule(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A single extraction rule could not be evaluated.
///
/// Only the contribution of the failing rule is lost; the rest of the record
/// is still extracted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Error indexing custom field '{field}' for format '{key}': {source}")]
    CustomField {
        field: String,
        key: String,
        source: XPathError,
    },

    #[error("Error indexing standard field '{field}' for format '{key}': {source}")]
    StandardField {
        field: String,
        key: String,
        source: XPathError,
    },

    #[error("Error extracting relationships '{relation}' for format '{key}': {source}")]
    Relationship {
        relation: String,
        key: String,
        source: XPathError,
    },
}

/// A lifecycle contract of the extractor was violated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingError {
    /// An accessor was called before extraction completed.
    #[error("'{0}' may only be read after extraction has completed")]
    NotExtracted(&'static str),

    /// A setter was called after extraction completed.
    #[error("'{0}' may not be changed after extraction has completed")]
    AlreadyExtracted(&'static str),
}

/// A record could not be turned into an index document.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The record is not well-formed XML.
    #[error("Unable to parse record '{id}': {message}")]
    Parse { id: String, message: String },

    /// The collection has not been registered.
    #[error("Collection '{0}' is not configured")]
    UnknownCollection(String),

    /// Extraction finished in a state that cannot be read back.
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    /// The index rejected the write.
    #[error(transparent)]
    Index(#[from] SearchIndexError),
}

/// A listener failed while handling an event.
///
/// Caught by the event bus and recorded in the status log; never propagated
/// to other listeners or to the caller of `fire`.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The listener is already running a pass.
    #[error("Indexing is already in progress: {0}")]
    AlreadyRunning(String),

    /// The listener's configuration is missing or invalid.
    #[error("Listener configuration error: {0}")]
    Config(String),

    /// Reading the record directory failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The index rejected an operation.
    #[error(transparent)]
    Index(#[from] SearchIndexError),

    /// Any other listener failure.
    #[error("{0}")]
    Failed(String),
}

impl ListenerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Synchronous failures of the event bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// `fire` was called with no listeners registered.
    #[error("No item indexers are registered")]
    NoListeners,

    /// A targeted event named a listener that is not registered.
    #[error("No item indexer with id '{0}' is registered")]
    UnknownListener(String),

    /// The schedule could not be parsed.
    #[error("Invalid indexing schedule: {0}")]
    InvalidSchedule(String),
}

impl EventBusError {
    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }
}
