//! Configuration types for the CollectionIndexWriter.

/// Configuration for the CollectionIndexWriter.
///
/// Controls which collections are managed internally and therefore may not be
/// deleted through the writer.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndexWriterConfig {
    /// Collection keys that `delete_collection` refuses to remove.
    ///
    /// Comparison is case-insensitive. Empty by default.
    pub protected_collections: Vec<String>,
}

impl CollectionIndexWriterConfig {
    /// Create a config that protects the given collection keys from deletion.
    ///
    /// # Arguments
    ///
    /// * `keys` - Collection keys managed outside the indexing listeners
    pub fn with_protected_collections<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected_collections: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a collection key is protected from deletion.
    pub fn is_protected(&self, collection_key: &str) -> bool {
        self.protected_collections
            .iter()
            .any(|k| k.eq_ignore_ascii_case(collection_key))
    }
}
