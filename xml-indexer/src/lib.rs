//! # XML Indexer
//!
//! Extracts search fields from XML metadata records and keeps a search index
//! in step with the collections those records come from.
//!
//! ## Architecture
//!
//! 1. **Extractor**: Turns one parsed record into a named field set, using
//!    generic path fields plus rules configured per format or schema
//! 2. **Processor**: Parses record text, extracts it and writes the result to
//!    the index under the current session
//! 3. **Events**: Fans indexing requests out to item indexers and runs the
//!    daily schedule
//! 4. **Orchestrator**: Registers the indexers and drives the lifecycle
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`errors`]: Error types for the indexer
//! - [`events`]: Event bus, item indexer trait and scheduler
//! - [`extractor`]: The document field extractor
//! - [`fields_config`]: Per-format extraction rules and their loader
//! - [`indexers`]: Concrete item indexers
//! - [`orchestrator`]: Coordinates the indexing lifecycle
//! - [`processor`]: Parses and indexes single records
//! - [`xpath`]: Path expressions over the parsed tree

pub mod config;
pub mod errors;
pub mod events;
pub mod extractor;
pub mod fields_config;
pub mod indexers;
pub mod orchestrator;
pub mod processor;
pub mod xpath;

pub use config::{Dependencies, Settings};

use errors::{ConfigError, EventBusError};
use thiserror::Error;
use xml_indexer_repository::SearchIndexError;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The field extraction configuration could not be loaded.
    #[error(transparent)]
    FieldsConfig(#[from] ConfigError),

    /// The event bus refused a request.
    #[error(transparent)]
    EventBus(#[from] EventBusError),

    /// The search index failed.
    #[error(transparent)]
    Index(#[from] SearchIndexError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
