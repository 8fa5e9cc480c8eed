//! # XML Indexer Repository
//!
//! This crate provides the write side of the search index. It includes
//! definitions for errors, the provider interface, an in-memory provider,
//! the rolling status log and the collection index writer that manages
//! collections and session-scoped indexing passes.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod service;
pub mod status;
pub mod types;
pub mod utils;

pub use config::CollectionIndexWriterConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use memory::InMemoryIndexProvider;
pub use service::CollectionIndexWriter;
pub use status::{IndexingStatusLog, DEFAULT_STATUS_LOG_CAPACITY};
pub use types::{CollectionInfo, IndexDocument, StaleSessionSummary};
pub use utils::validate_identifier;
