//! Search index provider trait definition.
//!
//! This module defines the abstract interface for the external search index.
//! Storage, tokenization and ranking all live behind this trait.

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::IndexDocument;

/// Abstracts the underlying search index implementation.
///
/// Implementations must provide atomic per-document add/replace/delete.
/// Deleting by term for one collection's session marker must be safe to run
/// concurrently with writes to other collections.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error
/// handling across different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index exists, creating it if necessary.
    ///
    /// This method should be called during application startup to ensure the backend
    /// is properly initialized before performing document operations.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Add a document, replacing any existing document with the same id (upsert).
    ///
    /// # Arguments
    ///
    /// * `document` - The document id and its complete field set
    async fn put_document(&self, document: &IndexDocument) -> Result<(), SearchIndexError>;

    /// Fetch a document by id.
    async fn get_document(&self, id: &str) -> Result<Option<IndexDocument>, SearchIndexError>;

    /// Delete a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If a document was removed
    /// * `Ok(false)` - If no document had that id
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_document(&self, id: &str) -> Result<bool, SearchIndexError>;

    /// Delete every document that has a field `field` with exactly `value`.
    ///
    /// # Returns
    ///
    /// The number of documents removed.
    async fn delete_documents_by_term(
        &self,
        field: &str,
        value: &str,
    ) -> Result<usize, SearchIndexError>;

    /// List the distinct values present for a field across all documents.
    async fn terms(&self, field: &str) -> Result<Vec<String>, SearchIndexError>;

    /// Number of documents currently in the index.
    async fn num_docs(&self) -> Result<usize, SearchIndexError>;
}
