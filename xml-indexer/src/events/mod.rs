//! Indexing events, item indexers and the dispatching bus.
//!
//! Item indexers are the components that actually read records from a source
//! and write them through the [`CollectionIndexWriter`]. They never call each
//! other; the [`IndexingEventBus`] fans every event out to each registered
//! indexer as an isolated task, so a failing or panicking indexer only shows
//! up as an entry in the status log.
//!
//! [`CollectionIndexWriter`]: xml_indexer_repository::CollectionIndexWriter

mod bus;
mod listener;
mod scheduler;

pub use bus::{
    DispatchFailure, DispatchHandle, DispatchReport, EventBusConfig, IndexingEventBus,
    DEFAULT_CONFIG_DIRECTORY, DEFAULT_MAX_CONCURRENT_DISPATCHES,
};
pub use listener::{IndexingEvent, IndexingEventType, ItemIndexer};
pub use scheduler::{IndexingSchedule, SCHEDULE_PERIOD};
