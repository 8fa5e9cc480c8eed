//! Event payloads and the item indexer capability.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use xml_indexer_repository::CollectionIndexWriter;

use crate::errors::ListenerError;

/// Kinds of indexing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexingEventType {
    /// Re-read configuration and initialize. Sent to each indexer when it is
    /// registered, and broadcast when configuration changes.
    ConfigureAndInitialize,
    /// The index writer is ready to accept records.
    IndexerReady,
    /// Re-register the collections the indexer manages.
    UpdateCollections,
    /// Index the collection named by the event's collection key.
    BeginIndexingCollection,
    /// Index every collection the indexer manages.
    BeginIndexingAllCollections,
    /// Stop any pass in progress at the next record boundary.
    AbortIndexing,
}

impl IndexingEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigureAndInitialize => "ConfigureAndInitialize",
            Self::IndexerReady => "IndexerReady",
            Self::UpdateCollections => "UpdateCollections",
            Self::BeginIndexingCollection => "BeginIndexingCollection",
            Self::BeginIndexingAllCollections => "BeginIndexingAllCollections",
            Self::AbortIndexing => "AbortIndexing",
        }
    }

    /// Events delivered outside the dispatch pool, so they reach an indexer
    /// even while its passes hold every slot.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::ConfigureAndInitialize | Self::IndexerReady | Self::AbortIndexing
        )
    }
}

impl fmt::Display for IndexingEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fired event, as delivered to each item indexer.
///
/// Carries the writer so indexers do not need their own handle to it.
#[derive(Clone)]
pub struct IndexingEvent {
    pub id: Uuid,
    pub event_type: IndexingEventType,
    /// Target collection for [`IndexingEventType::BeginIndexingCollection`].
    pub collection_key: Option<String>,
    pub writer: Arc<CollectionIndexWriter>,
    pub fired_at: DateTime<Utc>,
}

impl IndexingEvent {
    pub fn new(
        event_type: IndexingEventType,
        collection_key: Option<String>,
        writer: Arc<CollectionIndexWriter>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            collection_key,
            writer,
            fired_at: Utc::now(),
        }
    }
}

impl fmt::Debug for IndexingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingEvent")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("collection_key", &self.collection_key)
            .field("fired_at", &self.fired_at)
            .finish()
    }
}

impl fmt::Display for IndexingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection_key {
            Some(key) => write!(f, "{} event for collection '{}'", self.event_type, key),
            None => write!(f, "{} event", self.event_type),
        }
    }
}

/// A component that indexes records when told to by the event bus.
///
/// Implementations must be cheap to share: the bus holds them behind `Arc`
/// and may deliver several events to the same indexer concurrently.
#[async_trait]
pub trait ItemIndexer: Send + Sync {
    /// Identifier used to target events at this indexer.
    fn id(&self) -> &str;

    /// Directory holding the indexer's own configuration files.
    ///
    /// Called once by the bus before the indexer is registered.
    fn set_config_directory(&self, dir: &Path);

    /// Handle one event.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The event was handled
    /// * `Err(ListenerError)` - Recorded in the status log by the bus
    async fn on_event(&self, event: &IndexingEvent) -> Result<(), ListenerError>;
}
