//! Error types for the XML indexer repository.
//!
//! This module provides a unified error type for all index-writer operations.

mod search_index_error;

pub use search_index_error::SearchIndexError;
