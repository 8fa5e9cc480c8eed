//! Collection index writer.
//!
//! This module provides the main service for writing records into the search
//! index on behalf of a collection, and for purging the documents of earlier
//! indexing passes once a new pass over the collection has completed.
//!
//! # Session contract
//!
//! Every `put` is tagged with the generation marker of an [`IndexingSession`].
//! While a pass is running, readers see the documents of the previous pass
//! alongside the ones already rewritten by the new pass. Only after *all*
//! `put` calls of a pass have completed may the caller invoke
//! [`CollectionIndexWriter::delete_stale_sessions`]; calling it earlier would
//! leave a gap in the collection. The writer does not enforce this ordering.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument, warn};
use xml_indexer_shared::{fields, IndexedField, IndexingSession, SessionClock};

use crate::config::CollectionIndexWriterConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::status::IndexingStatusLog;
use crate::types::{CollectionInfo, IndexDocument, StaleSessionSummary};
use crate::utils::validate_identifier;

/// The main service for writing collections and records to the search index.
///
/// This is the high-level API that indexing listeners use. It validates
/// input, keeps the registry of configured collections, tags documents with
/// their session and delegates storage to a `SearchIndexProvider`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use xml_indexer_repository::{
///     CollectionIndexWriter, CollectionInfo, InMemoryIndexProvider, IndexingStatusLog,
/// };
/// use xml_indexer_shared::IndexedField;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let writer = CollectionIndexWriter::new(
///     Arc::new(InMemoryIndexProvider::new()),
///     Arc::new(IndexingStatusLog::default()),
/// );
/// writer
///     .put_collection(CollectionInfo {
///         key: "dcc".to_string(),
///         format: "adn".to_string(),
///         name: "DLESE Community Collection".to_string(),
///         description: String::new(),
///         additional_metadata: None,
///     })
///     .await?;
///
/// let session = writer.new_session("dcc")?;
/// writer
///     .put(vec![IndexedField::stored_text("title", "Rocks")], "dcc", "rec-1", &session)
///     .await?;
///
/// // Only once the whole pass has been written:
/// writer.delete_stale_sessions(&session).await?;
/// # Ok(())
/// # }
/// ```
pub struct CollectionIndexWriter {
    provider: Arc<dyn SearchIndexProvider>,
    config: CollectionIndexWriterConfig,
    collections: RwLock<BTreeMap<String, CollectionInfo>>,
    clock: SessionClock,
    status: Arc<IndexingStatusLog>,
}

impl CollectionIndexWriter {
    /// Create a new writer with default configuration.
    ///
    /// # Arguments
    ///
    /// * `provider` - The search index backend
    /// * `status` - Rolling status log shared with the event bus
    pub fn new(provider: Arc<dyn SearchIndexProvider>, status: Arc<IndexingStatusLog>) -> Self {
        Self::with_config(provider, status, CollectionIndexWriterConfig::default())
    }

    /// Create a new writer with custom configuration.
    pub fn with_config(
        provider: Arc<dyn SearchIndexProvider>,
        status: Arc<IndexingStatusLog>,
        config: CollectionIndexWriterConfig,
    ) -> Self {
        Self {
            provider,
            config,
            collections: RwLock::new(BTreeMap::new()),
            clock: SessionClock::new(),
            status,
        }
    }

    /// The underlying search index provider.
    pub fn provider(&self) -> &Arc<dyn SearchIndexProvider> {
        &self.provider
    }

    /// The status log this writer posts to.
    pub fn status_log(&self) -> &Arc<IndexingStatusLog> {
        &self.status
    }

    /// Register a collection, replacing any previous registration with the same key.
    pub async fn put_collection(&self, info: CollectionInfo) -> Result<(), SearchIndexError> {
        validate_identifier("collection_key", &info.key)?;
        if info.format.trim().is_empty() {
            return Err(SearchIndexError::validation(format!(
                "format is required for collection '{}'",
                info.key
            )));
        }

        self.print_private_status_message(&format!(
            "Adding collection '{}', key '{}'",
            info.name, info.key
        ))
        .await;

        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(info.key.clone(), info);
        Ok(())
    }

    /// Remove a collection and every document that belongs to it.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of documents removed
    /// * `Err(SearchIndexError::PermissionDenied)` - If the collection is protected
    pub async fn delete_collection(&self, collection_key: &str) -> Result<usize, SearchIndexError> {
        if self.config.is_protected(collection_key) {
            let msg = format!(
                "Permission denied to delete collection '{}': it is managed internally",
                collection_key
            );
            self.print_private_status_message(&msg).await;
            return Err(SearchIndexError::permission_denied(msg));
        }

        self.print_private_status_message(&format!("Deleting collection '{}'", collection_key))
            .await;

        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(collection_key);

        self.provider
            .delete_documents_by_term(fields::COLLECTION, collection_key)
            .await
    }

    /// Keys of the configured collections, excluding protected ones.
    pub fn configured_collections(&self) -> Vec<String> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .filter(|key| !self.config.is_protected(key))
            .cloned()
            .collect()
    }

    /// Registration details of a collection.
    pub fn collection(&self, collection_key: &str) -> Option<CollectionInfo> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(collection_key)
            .cloned()
    }

    pub fn is_collection_configured(&self, collection_key: &str) -> bool {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(collection_key)
    }

    /// Start a new indexing pass over a collection.
    ///
    /// Each call returns a session with a distinct generation id embedding the
    /// collection key.
    pub fn new_session(&self, collection_key: &str) -> Result<IndexingSession, SearchIndexError> {
        validate_identifier("collection_key", collection_key)?;
        let session = self.clock.new_session(collection_key);
        debug!(session = %session, "Started indexing session");
        Ok(session)
    }

    /// Add or replace a record in a collection.
    ///
    /// Every field is tagged with the session's generation id, and the
    /// collection, format and session marker are appended as fields of their
    /// own so that the document can later be found by collection or session.
    ///
    /// # Arguments
    ///
    /// * `record_fields` - The extracted field set of the record
    /// * `collection_key` - A registered collection
    /// * `id` - The record id, used as the upsert key
    /// * `session` - The indexing pass this write belongs to
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was written
    /// * `Err(SearchIndexError::CollectionNotConfigured)` - If the collection is unknown
    /// * `Err(SearchIndexError::ValidationError)` - If the id is invalid or the
    ///   session belongs to another collection
    pub async fn put(
        &self,
        record_fields: Vec<IndexedField>,
        collection_key: &str,
        id: &str,
        session: &IndexingSession,
    ) -> Result<(), SearchIndexError> {
        validate_identifier("id", id)?;
        let info = self
            .collection(collection_key)
            .ok_or_else(|| SearchIndexError::collection_not_configured(collection_key))?;

        if session.collection_key() != collection_key {
            return Err(SearchIndexError::validation(format!(
                "session '{}' does not belong to collection '{}'",
                session, collection_key
            )));
        }

        let generation_id = session.generation_id();
        let mut document_fields: Vec<IndexedField> = record_fields
            .into_iter()
            .map(|field| field.with_session(generation_id))
            .collect();
        document_fields.push(
            IndexedField::stored_key(fields::COLLECTION, collection_key).with_session(generation_id),
        );
        document_fields.push(
            IndexedField::stored_key(fields::XML_FORMAT, info.format).with_session(generation_id),
        );
        document_fields.push(
            IndexedField::stored_key(fields::INDEX_SESSION_ID, generation_id)
                .with_session(generation_id),
        );

        self.provider
            .put_document(&IndexDocument::new(id, document_fields))
            .await
    }

    /// Delete a record from the index.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a document was removed, `Ok(false)` if none had that id.
    pub async fn delete_record(&self, id: &str) -> Result<bool, SearchIndexError> {
        validate_identifier("id", id)?;
        self.provider.delete_document(id).await
    }

    /// Delete the documents of every earlier session of the current session's collection.
    ///
    /// Enumerates the distinct session markers present in the index. For each
    /// marker whose collection matches `current_session` but whose full value
    /// differs, every document carrying that marker is removed. Documents of
    /// other collections are never touched.
    ///
    /// Must only be called after every `put` of the current pass has completed.
    #[instrument(skip(self), fields(session = %current_session))]
    pub async fn delete_stale_sessions(
        &self,
        current_session: &IndexingSession,
    ) -> Result<StaleSessionSummary, SearchIndexError> {
        let indexed_sessions = self.provider.terms(fields::INDEX_SESSION_ID).await?;
        let mut summary = StaleSessionSummary::default();

        for value in indexed_sessions {
            let Some(indexed_session) = IndexingSession::from_generation_id(&value) else {
                warn!(value = %value, "Ignoring malformed session marker in index");
                continue;
            };

            if indexed_session.collection_key() != current_session.collection_key()
                || indexed_session == *current_session
            {
                continue;
            }

            let deleted = self
                .provider
                .delete_documents_by_term(fields::INDEX_SESSION_ID, indexed_session.generation_id())
                .await?;

            self.print_private_status_message(&format!(
                "Deleted records for session: {}. Num deleted: {}",
                indexed_session, deleted
            ))
            .await;

            summary.documents_deleted += deleted;
            summary.sessions_deleted.push(value);
        }

        info!(
            sessions_deleted = summary.sessions_deleted.len(),
            documents_deleted = summary.documents_deleted,
            "Deleted stale sessions"
        );
        Ok(summary)
    }

    /// Number of documents in the index.
    pub async fn num_docs(&self) -> Result<usize, SearchIndexError> {
        self.provider.num_docs().await
    }

    /// Post a status message to the rolling log, stamped with the current index size.
    pub async fn print_status_message(&self, msg: &str) {
        let size = match self.provider.num_docs().await {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, "Unable to read index size for status message");
                0
            }
        };
        self.status.record(msg, size);
    }

    async fn print_private_status_message(&self, msg: &str) {
        self.print_status_message(&format!("Indexer: {}", msg)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryIndexProvider;
    use async_trait::async_trait;

    /// Mock provider that fails every operation.
    struct FailingProvider;

    #[async_trait]
    impl SearchIndexProvider for FailingProvider {
        async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn put_document(&self, _document: &IndexDocument) -> Result<(), SearchIndexError> {
            Err(SearchIndexError::index("Mock failure"))
        }

        async fn get_document(
            &self,
            _id: &str,
        ) -> Result<Option<IndexDocument>, SearchIndexError> {
            Err(SearchIndexError::read("Mock failure"))
        }

        async fn delete_document(&self, _id: &str) -> Result<bool, SearchIndexError> {
            Err(SearchIndexError::delete("Mock failure"))
        }

        async fn delete_documents_by_term(
            &self,
            _field: &str,
            _value: &str,
        ) -> Result<usize, SearchIndexError> {
            Err(SearchIndexError::delete("Mock failure"))
        }

        async fn terms(&self, _field: &str) -> Result<Vec<String>, SearchIndexError> {
            Err(SearchIndexError::read("Mock failure"))
        }

        async fn num_docs(&self) -> Result<usize, SearchIndexError> {
            Err(SearchIndexError::read("Mock failure"))
        }
    }

    fn collection(key: &str) -> CollectionInfo {
        CollectionInfo {
            key: key.to_string(),
            format: "adn".to_string(),
            name: format!("Collection {}", key),
            description: String::new(),
            additional_metadata: None,
        }
    }

    fn writer() -> (CollectionIndexWriter, Arc<InMemoryIndexProvider>) {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let writer =
            CollectionIndexWriter::new(provider.clone(), Arc::new(IndexingStatusLog::default()));
        (writer, provider)
    }

    fn fields_for(title: &str) -> Vec<IndexedField> {
        vec![IndexedField::stored_text("title", title)]
    }

    #[tokio::test]
    async fn test_put_requires_configured_collection() {
        let (writer, _) = writer();
        let session = writer.new_session("dcc").unwrap();

        let result = writer.put(fields_for("x"), "dcc", "rec-1", &session).await;
        assert!(matches!(
            result,
            Err(SearchIndexError::CollectionNotConfigured(ref key)) if key == "dcc"
        ));
    }

    #[tokio::test]
    async fn test_put_tags_fields_with_session() {
        let (writer, provider) = writer();
        writer.put_collection(collection("dcc")).await.unwrap();
        let session = writer.new_session("dcc").unwrap();

        writer
            .put(fields_for("Rocks"), "dcc", "rec-1", &session)
            .await
            .unwrap();

        let doc = provider.get_document("rec-1").await.unwrap().unwrap();
        assert!(doc
            .fields
            .iter()
            .all(|f| f.session_id.as_deref() == Some(session.generation_id())));
        assert_eq!(
            doc.first_value(fields::INDEX_SESSION_ID),
            Some(session.generation_id())
        );
        assert_eq!(doc.first_value(fields::COLLECTION), Some("dcc"));
        assert_eq!(doc.first_value(fields::XML_FORMAT), Some("adn"));
        assert_eq!(doc.first_value("title"), Some("Rocks"));
    }

    #[tokio::test]
    async fn test_put_rejects_session_of_other_collection() {
        let (writer, _) = writer();
        writer.put_collection(collection("dcc")).await.unwrap();
        let session = writer.new_session("other").unwrap();

        let result = writer.put(fields_for("x"), "dcc", "rec-1", &session).await;
        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_delete_stale_sessions_only_touches_own_collection() {
        let (writer, provider) = writer();
        writer.put_collection(collection("dcc")).await.unwrap();
        writer.put_collection(collection("comet")).await.unwrap();

        let s1 = writer.new_session("dcc").unwrap();
        let other = writer.new_session("comet").unwrap();
        writer.put(fields_for("a"), "dcc", "old-1", &s1).await.unwrap();
        writer.put(fields_for("b"), "dcc", "old-2", &s1).await.unwrap();
        writer.put(fields_for("c"), "comet", "comet-1", &other).await.unwrap();

        let s2 = writer.new_session("dcc").unwrap();
        writer.put(fields_for("d"), "dcc", "new-1", &s2).await.unwrap();

        let summary = writer.delete_stale_sessions(&s2).await.unwrap();
        assert_eq!(summary.documents_deleted, 2);
        assert_eq!(summary.sessions_deleted, vec![s1.generation_id().to_string()]);

        assert!(provider.get_document("old-1").await.unwrap().is_none());
        assert!(provider.get_document("old-2").await.unwrap().is_none());
        assert!(provider.get_document("new-1").await.unwrap().is_some());
        assert!(provider.get_document("comet-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rewritten_record_survives_stale_deletion() {
        let (writer, provider) = writer();
        writer.put_collection(collection("dcc")).await.unwrap();

        let s1 = writer.new_session("dcc").unwrap();
        writer.put(fields_for("v1"), "dcc", "rec-1", &s1).await.unwrap();
        let s2 = writer.new_session("dcc").unwrap();
        writer.put(fields_for("v2"), "dcc", "rec-1", &s2).await.unwrap();

        writer.delete_stale_sessions(&s2).await.unwrap();
        let doc = provider.get_document("rec-1").await.unwrap().unwrap();
        assert_eq!(doc.first_value("title"), Some("v2"));
    }

    #[tokio::test]
    async fn test_delete_collection_removes_documents() {
        let (writer, provider) = writer();
        writer.put_collection(collection("dcc")).await.unwrap();
        let session = writer.new_session("dcc").unwrap();
        writer.put(fields_for("a"), "dcc", "rec-1", &session).await.unwrap();

        let removed = writer.delete_collection("dcc").await.unwrap();
        assert_eq!(removed, 1);
        assert!(!writer.is_collection_configured("dcc"));
        assert_eq!(provider.num_docs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_protected_collection_cannot_be_deleted() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let status = Arc::new(IndexingStatusLog::default());
        let writer = CollectionIndexWriter::with_config(
            provider,
            status.clone(),
            CollectionIndexWriterConfig::with_protected_collections(["collect"]),
        );
        writer.put_collection(collection("collect")).await.unwrap();

        let result = writer.delete_collection("COLLECT").await;
        assert!(matches!(result, Err(SearchIndexError::PermissionDenied(_))));
        assert!(writer.is_collection_configured("collect"));
        assert!(writer.configured_collections().is_empty());
        assert!(status
            .messages()
            .iter()
            .any(|m| m.contains("Permission denied")));
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let writer = CollectionIndexWriter::new(
            Arc::new(FailingProvider),
            Arc::new(IndexingStatusLog::default()),
        );
        writer.put_collection(collection("dcc")).await.unwrap();
        let session = writer.new_session("dcc").unwrap();

        let result = writer.put(fields_for("a"), "dcc", "rec-1", &session).await;
        assert!(matches!(result, Err(SearchIndexError::IndexError(_))));

        let result = writer.delete_stale_sessions(&session).await;
        assert!(matches!(result, Err(SearchIndexError::ReadError(_))));
    }

    #[test]
    fn test_new_session_rejects_empty_key() {
        let (writer, _) = writer();
        assert!(writer.new_session("").is_err());
    }
}
