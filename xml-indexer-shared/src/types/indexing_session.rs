//! Indexing sessions.
//!
//! Every pass over a collection writes its documents tagged with a generation
//! marker. Once the pass has completed, documents of the same collection that
//! carry any other marker are stale and can be removed.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Opaque per-pass generation marker bound to a collection.
///
/// The generation id has the form `{millis}-{collection_key}`. Two sessions are
/// equal only when their full generation ids are equal.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct IndexingSession {
    collection_key: String,
    generation_id: String,
}

impl IndexingSession {
    /// Create a session for a collection using the given timestamp.
    pub fn new_at(collection_key: impl Into<String>, millis: i64) -> Self {
        let collection_key = collection_key.into();
        let generation_id = format!("{}-{}", millis, collection_key);
        Self {
            collection_key,
            generation_id,
        }
    }

    /// Rebuild a session from a generation id found in the index.
    ///
    /// Returns `None` when the value does not have the `{millis}-{collection}`
    /// shape.
    pub fn from_generation_id(generation_id: &str) -> Option<Self> {
        let (millis, collection_key) = generation_id.split_once('-')?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            collection_key: collection_key.to_string(),
            generation_id: generation_id.to_string(),
        })
    }

    /// The collection this session belongs to.
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    /// The full generation marker.
    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }
}

impl PartialEq for IndexingSession {
    fn eq(&self, other: &Self) -> bool {
        self.generation_id == other.generation_id
    }
}

impl std::hash::Hash for IndexingSession {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.generation_id.hash(state);
    }
}

impl std::fmt::Display for IndexingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.generation_id)
    }
}

/// Issues strictly increasing millisecond timestamps for new sessions.
///
/// Wall-clock milliseconds are used when they move forward; otherwise the
/// previous value is bumped by one so that two sessions created within the
/// same millisecond still get distinct generation ids.
#[derive(Debug, Default)]
pub struct SessionClock {
    last: AtomicI64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, never equal to a previously issued one.
    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let next = if now > previous { now } else { previous + 1 };
            match self
                .last
                .compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }

    /// Start a new session for a collection.
    pub fn new_session(&self, collection_key: &str) -> IndexingSession {
        IndexingSession::new_at(collection_key, self.next_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_id_format() {
        let session = IndexingSession::new_at("dcc", 1700000000000);
        assert_eq!(session.generation_id(), "1700000000000-dcc");
        assert_eq!(session.collection_key(), "dcc");
    }

    #[test]
    fn test_sessions_are_distinct() {
        let clock = SessionClock::new();
        let first = clock.new_session("dcc");
        let second = clock.new_session("dcc");

        assert_ne!(first, second);
        assert_ne!(first.generation_id(), second.generation_id());
        assert!(first.generation_id().ends_with("-dcc"));
        assert!(second.generation_id().ends_with("-dcc"));
    }

    #[test]
    fn test_equality_uses_full_id() {
        let a = IndexingSession::new_at("dcc", 5);
        let b = IndexingSession::from_generation_id("5-dcc").unwrap();
        let c = IndexingSession::new_at("dcc", 6);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parse_collection_with_dashes() {
        let session = IndexingSession::from_generation_id("42-my-collection").unwrap();
        assert_eq!(session.collection_key(), "my-collection");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(IndexingSession::from_generation_id("no-timestamp").is_none());
        assert!(IndexingSession::from_generation_id("12345").is_none());
        assert!(IndexingSession::from_generation_id("-dcc").is_none());
    }
}
