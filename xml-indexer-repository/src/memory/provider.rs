//! In-memory provider implementation.
//!
//! Keeps every document in a map guarded by a read/write lock. Used by the
//! binary when no external index is wired in, and by tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::IndexDocument;

/// In-memory search index keyed by document id.
pub struct InMemoryIndexProvider {
    documents: RwLock<BTreeMap<String, IndexDocument>>,
}

impl InMemoryIndexProvider {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, IndexDocument>> {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, IndexDocument>> {
        self.documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryIndexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryIndexProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn put_document(&self, document: &IndexDocument) -> Result<(), SearchIndexError> {
        let replaced = self
            .write()
            .insert(document.id.clone(), document.clone())
            .is_some();
        debug!(id = %document.id, replaced, "Stored document");
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<IndexDocument>, SearchIndexError> {
        Ok(self.read().get(id).cloned())
    }

    async fn delete_document(&self, id: &str) -> Result<bool, SearchIndexError> {
        Ok(self.write().remove(id).is_some())
    }

    async fn delete_documents_by_term(
        &self,
        field: &str,
        value: &str,
    ) -> Result<usize, SearchIndexError> {
        let mut documents = self.write();
        let before = documents.len();
        documents.retain(|_, doc| !doc.has_term(field, value));
        Ok(before - documents.len())
    }

    async fn terms(&self, field: &str) -> Result<Vec<String>, SearchIndexError> {
        let terms: BTreeSet<String> = self
            .read()
            .values()
            .flat_map(|doc| doc.values(field))
            .map(str::to_string)
            .collect();
        Ok(terms.into_iter().collect())
    }

    async fn num_docs(&self) -> Result<usize, SearchIndexError> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xml_indexer_shared::IndexedField;

    fn doc(id: &str, session: &str) -> IndexDocument {
        IndexDocument::new(
            id,
            vec![
                IndexedField::stored_text("title", format!("Title {}", id)),
                IndexedField::stored_key("indexSessionId", session),
            ],
        )
    }

    #[tokio::test]
    async fn test_put_replaces_by_id() {
        let provider = InMemoryIndexProvider::new();
        provider.put_document(&doc("a", "1-x")).await.unwrap();
        provider.put_document(&doc("a", "2-x")).await.unwrap();

        assert_eq!(provider.num_docs().await.unwrap(), 1);
        let stored = provider.get_document("a").await.unwrap().unwrap();
        assert_eq!(stored.first_value("indexSessionId"), Some("2-x"));
    }

    #[tokio::test]
    async fn test_terms_are_distinct_and_sorted() {
        let provider = InMemoryIndexProvider::new();
        provider.put_document(&doc("a", "2-x")).await.unwrap();
        provider.put_document(&doc("b", "1-x")).await.unwrap();
        provider.put_document(&doc("c", "2-x")).await.unwrap();

        let terms = provider.terms("indexSessionId").await.unwrap();
        assert_eq!(terms, vec!["1-x".to_string(), "2-x".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_by_term() {
        let provider = InMemoryIndexProvider::new();
        provider.put_document(&doc("a", "1-x")).await.unwrap();
        provider.put_document(&doc("b", "1-x")).await.unwrap();
        provider.put_document(&doc("c", "2-x")).await.unwrap();

        let removed = provider
            .delete_documents_by_term("indexSessionId", "1-x")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(provider.num_docs().await.unwrap(), 1);
        assert!(provider.get_document("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_document() {
        let provider = InMemoryIndexProvider::new();
        assert!(!provider.delete_document("missing").await.unwrap());
    }
}
