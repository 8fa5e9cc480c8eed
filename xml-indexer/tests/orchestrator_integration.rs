//! Integration tests for the XML indexer orchestrator.
//!
//! These tests use the real Orchestrator and event bus with mock item
//! indexers and a mock search index provider.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use xml_indexer::errors::ListenerError;
use xml_indexer::events::{IndexingEvent, IndexingEventBus, IndexingEventType, IndexingSchedule, ItemIndexer};
use xml_indexer::orchestrator::{Orchestrator, OrchestratorConfig};
use xml_indexer::IndexingError;
use xml_indexer_repository::{
    CollectionIndexWriter, IndexDocument, InMemoryIndexProvider, IndexingStatusLog, SearchIndexError,
    SearchIndexProvider,
};

const WAIT: Duration = Duration::from_secs(10);

// Mock item indexer that records the events it receives
#[derive(Default)]
struct MockIndexer {
    events: Mutex<Vec<IndexingEventType>>,
}

impl MockIndexer {
    fn events(&self) -> Vec<IndexingEventType> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemIndexer for MockIndexer {
    fn id(&self) -> &str {
        "mock"
    }

    fn set_config_directory(&self, _dir: &Path) {}

    async fn on_event(&self, event: &IndexingEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.event_type);
        Ok(())
    }
}

// Mock provider whose index cannot be created
struct UnavailableProvider;

#[async_trait]
impl SearchIndexProvider for UnavailableProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Err(SearchIndexError::connection("index is unreachable"))
    }

    async fn put_document(&self, _document: &IndexDocument) -> Result<(), SearchIndexError> {
        Err(SearchIndexError::connection("index is unreachable"))
    }

    async fn get_document(&self, _id: &str) -> Result<Option<IndexDocument>, SearchIndexError> {
        Ok(None)
    }

    async fn delete_document(&self, _id: &str) -> Result<bool, SearchIndexError> {
        Ok(false)
    }

    async fn delete_documents_by_term(&self, _field: &str, _value: &str) -> Result<usize, SearchIndexError> {
        Ok(0)
    }

    async fn terms(&self, _field: &str) -> Result<Vec<String>, SearchIndexError> {
        Ok(Vec::new())
    }

    async fn num_docs(&self) -> Result<usize, SearchIndexError> {
        Ok(0)
    }
}

fn bus_with(provider: Arc<dyn SearchIndexProvider>) -> Arc<IndexingEventBus> {
    let writer = Arc::new(CollectionIndexWriter::new(
        provider,
        Arc::new(IndexingStatusLog::default()),
    ));
    Arc::new(IndexingEventBus::new(writer))
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let bus = bus_with(Arc::new(InMemoryIndexProvider::new()));
    let indexer = Arc::new(MockIndexer::default());
    let indexers: Vec<Arc<dyn ItemIndexer>> = vec![indexer.clone()];

    let mut orchestrator = Orchestrator::with_config(
        bus.clone(),
        indexers,
        OrchestratorConfig {
            schedule: Some(IndexingSchedule::parse("2:00", Some("1,4")).unwrap()),
            index_on_startup: true,
            ..OrchestratorConfig::default()
        },
    );
    let shutdown = orchestrator.shutdown_handle();

    let handle = tokio::spawn(async move { orchestrator.run().await });

    // Wait for the startup pass to be delivered
    timeout(WAIT, async {
        while !indexer
            .events()
            .contains(&IndexingEventType::BeginIndexingAllCollections)
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("startup pass was fired");
    assert_eq!(bus.indexing_days_of_week(), Some(vec![1, 4]));

    shutdown.send(()).unwrap();
    let result = timeout(WAIT, handle).await.expect("orchestrator stopped").unwrap();
    assert!(result.is_ok());

    let events = indexer.events();
    assert_eq!(events[0], IndexingEventType::ConfigureAndInitialize);
    assert_eq!(events[1], IndexingEventType::IndexerReady);
    assert_eq!(events.last(), Some(&IndexingEventType::AbortIndexing));
    assert!(bus.indexing_start_time().is_none());
}

#[tokio::test]
async fn test_run_without_indexers_fails() {
    let bus = bus_with(Arc::new(InMemoryIndexProvider::new()));
    let mut orchestrator = Orchestrator::new(bus, Vec::new());

    let result = timeout(WAIT, orchestrator.run()).await.unwrap();
    assert!(matches!(result, Err(IndexingError::ConfigError(_))));
}

#[tokio::test]
async fn test_run_fails_when_index_is_unavailable() {
    let bus = bus_with(Arc::new(UnavailableProvider));
    let indexer = Arc::new(MockIndexer::default());
    let indexers: Vec<Arc<dyn ItemIndexer>> = vec![indexer.clone()];
    let mut orchestrator = Orchestrator::new(bus, indexers);

    let result = timeout(WAIT, orchestrator.run()).await.unwrap();
    assert!(matches!(
        result,
        Err(IndexingError::Index(SearchIndexError::ConnectionError(_)))
    ));
    assert!(indexer.events().is_empty());
}
