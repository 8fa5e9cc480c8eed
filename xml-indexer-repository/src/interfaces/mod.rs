//! Interface definitions for the search index provider.
//!
//! The `SearchIndexProvider` trait is the seam between the collection writer
//! and whatever index actually stores the documents.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
