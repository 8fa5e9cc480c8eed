//! Search index error types.
//!
//! This module defines the unified error type for all index-writer operations,
//! including both low-level backend errors and collection/session errors.

use thiserror::Error;

/// Unified errors from index-writer operations.
///
/// Used by the `SearchIndexProvider` trait and `CollectionIndexWriter` for all
/// search index operations. Synchronous `put`/`delete`/`new_session` failures
/// are returned directly to the caller as one of these variants.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., missing record id or collection key).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The collection has not been registered with `put_collection`.
    #[error("Collection '{0}' is not configured")]
    CollectionNotConfigured(String),

    /// The operation is not allowed on this collection.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Failed to establish connection to the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to read terms or statistics from the index.
    #[error("Read error: {0}")]
    ReadError(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a collection-not-configured error.
    pub fn collection_not_configured(collection_key: impl Into<String>) -> Self {
        Self::CollectionNotConfigured(collection_key.into())
    }

    /// Create a permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
