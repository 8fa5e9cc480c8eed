//! In-memory search index.

mod provider;

pub use provider::InMemoryIndexProvider;
