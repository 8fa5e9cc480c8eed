//! Item indexer for collections stored as directories of XML files.
//!
//! The collections are described by a JSON file in the indexer's
//! configuration directory:
//!
//! ```json
//! {
//!   "collections": [
//!     { "key": "dcc", "format": "oai_dc", "name": "DCC", "directory": "records/dcc" }
//!   ]
//! }
//! ```
//!
//! Relative directories are resolved against the configuration directory.
//! Every `*.xml` file in a collection directory is one record; the file stem
//! is used as the record id when the record itself does not provide one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use xml_indexer_repository::{CollectionIndexWriter, CollectionInfo};

use crate::errors::ListenerError;
use crate::events::{IndexingEvent, IndexingEventType, ItemIndexer};
use crate::fields_config::SharedFieldsConfig;
use crate::processor::RecordProcessor;

/// Name of the collections file inside the configuration directory.
pub const COLLECTIONS_FILE: &str = "collections.json";

/// One collection served from disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionSource {
    pub key: String,
    pub format: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub directory: PathBuf,
}

impl CollectionSource {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            key: self.key.clone(),
            format: self.format.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            additional_metadata: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionsFile {
    collections: Vec<CollectionSource>,
}

/// Outcome of one pass over a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub collection: String,
    pub indexed: usize,
    pub failed: usize,
    pub aborted: bool,
    /// Documents of earlier sessions removed after the pass.
    pub stale_deleted: usize,
}

/// Indexes directories of XML records.
pub struct FileSystemItemIndexer {
    id: String,
    fields_config: Arc<SharedFieldsConfig>,
    config_dir: RwLock<Option<PathBuf>>,
    collections: RwLock<Vec<CollectionSource>>,
    running: AtomicBool,
    abort_requested: AtomicBool,
}

/// Clears the running flag when a pass ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl FileSystemItemIndexer {
    pub fn new(id: impl Into<String>, fields_config: Arc<SharedFieldsConfig>) -> Self {
        Self {
            id: id.into(),
            fields_config,
            config_dir: RwLock::new(None),
            collections: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            abort_requested: AtomicBool::new(false),
        }
    }

    /// Collections read from the last successful load.
    pub fn collections(&self) -> Vec<CollectionSource> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.config_dir
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read the collections file and register every collection with the writer.
    async fn update_collections(&self, writer: &CollectionIndexWriter) -> Result<(), ListenerError> {
        let dir = self
            .config_dir()
            .ok_or_else(|| ListenerError::config("No configuration directory has been set"))?;
        let path = dir.join(COLLECTIONS_FILE);

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ListenerError::config(format!("Unable to read '{}': {}", path.display(), e)))?;
        let file: CollectionsFile = serde_json::from_str(&text)
            .map_err(|e| ListenerError::config(format!("Invalid collections file '{}': {}", path.display(), e)))?;

        let sources: Vec<CollectionSource> = file
            .collections
            .into_iter()
            .map(|mut source| {
                if source.directory.is_relative() {
                    source.directory = dir.join(&source.directory);
                }
                source
            })
            .collect();

        for source in &sources {
            writer.put_collection(source.info()).await?;
        }
        info!(indexer = %self.id, collections = sources.len(), "Collections updated");

        *self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sources;
        Ok(())
    }

    fn begin_run(&self) -> Result<RunGuard<'_>, ListenerError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ListenerError::AlreadyRunning(self.id.clone()))?;
        self.abort_requested.store(false, Ordering::SeqCst);
        Ok(RunGuard(&self.running))
    }

    /// Run passes over the given collections, stopping early on abort.
    async fn run(
        &self,
        sources: Vec<CollectionSource>,
        writer: &Arc<CollectionIndexWriter>,
    ) -> Result<Vec<PassSummary>, ListenerError> {
        let _guard = self.begin_run()?;
        let processor = RecordProcessor::new(writer.clone(), self.fields_config.clone());

        let mut summaries = Vec::with_capacity(sources.len());
        for source in &sources {
            let summary = self.index_collection(source, &processor).await?;
            let aborted = summary.aborted;
            summaries.push(summary);
            if aborted {
                break;
            }
        }
        Ok(summaries)
    }

    /// Index every record of one collection under a fresh session.
    ///
    /// Stale sessions are removed only when the pass ran to completion, so
    /// an aborted pass leaves old and new documents side by side.
    #[instrument(skip(self, source, processor), fields(indexer = %self.id, collection = %source.key))]
    async fn index_collection(
        &self,
        source: &CollectionSource,
        processor: &RecordProcessor,
    ) -> Result<PassSummary, ListenerError> {
        let writer = processor.writer();
        let session = writer.new_session(&source.key)?;
        let mut summary = PassSummary {
            collection: source.key.clone(),
            ..PassSummary::default()
        };

        writer
            .print_status_message(&format!(
                "Indexing collection '{}' from {}",
                source.key,
                source.directory.display()
            ))
            .await;

        for path in list_xml_files(&source.directory).await? {
            if self.abort_requested.load(Ordering::SeqCst) {
                summary.aborted = true;
                writer
                    .print_status_message(&format!(
                        "Indexing of collection '{}' was aborted. Records indexed: {}",
                        source.key, summary.indexed
                    ))
                    .await;
                return Ok(summary);
            }

            let fallback_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let xml = match tokio::fs::read_to_string(&path).await {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to read record");
                    summary.failed += 1;
                    continue;
                }
            };

            match processor
                .index_record(&xml, &source.key, &fallback_id, &session)
                .await
            {
                Ok(record) => {
                    debug!(id = %record.id, "Record indexed");
                    summary.indexed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to index record");
                    writer
                        .print_status_message(&format!("Error indexing '{}': {}", path.display(), e))
                        .await;
                    summary.failed += 1;
                }
            }
        }

        let stale = writer.delete_stale_sessions(&session).await?;
        summary.stale_deleted = stale.documents_deleted;

        writer
            .print_status_message(&format!(
                "Finished indexing collection '{}'. Records indexed: {}, failed: {}",
                source.key, summary.indexed, summary.failed
            ))
            .await;
        Ok(summary)
    }
}

#[async_trait]
impl ItemIndexer for FileSystemItemIndexer {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_config_directory(&self, dir: &Path) {
        *self
            .config_dir
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(dir.to_path_buf());
    }

    async fn on_event(&self, event: &IndexingEvent) -> Result<(), ListenerError> {
        match event.event_type {
            IndexingEventType::ConfigureAndInitialize => {
                if let Err(e) = self.fields_config.reload().await {
                    warn!(error = %e, "Keeping previous field extraction configuration");
                }
                self.update_collections(&event.writer).await
            }
            IndexingEventType::UpdateCollections => self.update_collections(&event.writer).await,
            IndexingEventType::IndexerReady => {
                debug!(indexer = %self.id, "Index writer is ready");
                Ok(())
            }
            IndexingEventType::BeginIndexingCollection => {
                let key = event
                    .collection_key
                    .as_deref()
                    .ok_or_else(|| ListenerError::failed("No collection key given"))?;
                let Some(source) = self.collections().into_iter().find(|c| c.key == key) else {
                    debug!(indexer = %self.id, collection = %key, "Collection is not served by this indexer");
                    return Ok(());
                };
                self.run(vec![source], &event.writer).await.map(|_| ())
            }
            IndexingEventType::BeginIndexingAllCollections => {
                self.run(self.collections(), &event.writer).await.map(|_| ())
            }
            IndexingEventType::AbortIndexing => {
                if self.is_running() {
                    info!(indexer = %self.id, "Abort requested");
                    self.abort_requested.store(true, Ordering::SeqCst);
                }
                Ok(())
            }
        }
    }
}

/// `*.xml` files of a directory, sorted by name.
async fn list_xml_files(dir: &Path) -> Result<Vec<PathBuf>, ListenerError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ListenerError::io(format!("Unable to read directory '{}': {}", dir.display(), e)))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ListenerError::io(format!("Unable to read directory '{}': {}", dir.display(), e)))?
    {
        let path = entry.path();
        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_xml && is_file {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use xml_indexer_repository::{InMemoryIndexProvider, IndexingStatusLog, SearchIndexProvider};

    fn writer() -> (Arc<CollectionIndexWriter>, Arc<InMemoryIndexProvider>) {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let writer = Arc::new(CollectionIndexWriter::new(
            provider.clone(),
            Arc::new(IndexingStatusLog::default()),
        ));
        (writer, provider)
    }

    fn setup(dir: &Path) {
        fs::create_dir_all(dir.join("records/dcc")).unwrap();
        fs::write(
            dir.join(COLLECTIONS_FILE),
            r#"{"collections":[{"key":"dcc","format":"oai_dc","name":"DCC","directory":"records/dcc"}]}"#,
        )
        .unwrap();
        fs::write(dir.join("records/dcc/a.xml"), "<dc><title>A</title></dc>").unwrap();
        fs::write(dir.join("records/dcc/b.xml"), "<dc><title>B</title></dc>").unwrap();
        fs::write(dir.join("records/dcc/notes.txt"), "ignored").unwrap();
    }

    fn indexer(dir: &Path) -> FileSystemItemIndexer {
        let indexer = FileSystemItemIndexer::new("fs", Arc::new(SharedFieldsConfig::empty()));
        indexer.set_config_directory(dir);
        indexer
    }

    #[tokio::test]
    async fn test_update_collections_registers_with_writer() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let (writer, _) = writer();
        let indexer = indexer(dir.path());

        let event = IndexingEvent::new(IndexingEventType::UpdateCollections, None, writer.clone());
        indexer.on_event(&event).await.unwrap();

        assert!(writer.is_collection_configured("dcc"));
        let sources = indexer.collections();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].directory, dir.path().join("records/dcc"));
    }

    #[tokio::test]
    async fn test_configure_reloads_field_configuration() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let index = dir.path().join("fields_index.xml");
        fs::write(&index, "<XMLIndexerFieldsConfigIndex/>").unwrap();
        fs::write(
            dir.path().join("dc_fields.xml"),
            r#"<XMLIndexerFieldsConfig xmlFormat="oai_dc"/>"#,
        )
        .unwrap();

        let fields_config = Arc::new(SharedFieldsConfig::from_file(&index).await.unwrap());
        let indexer = FileSystemItemIndexer::new("fs", fields_config.clone());
        indexer.set_config_directory(dir.path());
        assert!(!fields_config.snapshot().is_configured("oai_dc"));

        fs::write(
            &index,
            "<XMLIndexerFieldsConfigIndex><configurationFiles>\
             <configurationFile>dc_fields.xml</configurationFile>\
             </configurationFiles></XMLIndexerFieldsConfigIndex>",
        )
        .unwrap();
        let (writer, _) = writer();
        let configure =
            IndexingEvent::new(IndexingEventType::ConfigureAndInitialize, None, writer.clone());
        indexer.on_event(&configure).await.unwrap();

        assert!(fields_config.snapshot().is_configured("oai_dc"));
        assert!(writer.is_collection_configured("dcc"));
    }

    #[tokio::test]
    async fn test_missing_collections_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = writer();
        let indexer = indexer(dir.path());

        let event = IndexingEvent::new(IndexingEventType::UpdateCollections, None, writer);
        let result = indexer.on_event(&event).await;
        assert!(matches!(result, Err(ListenerError::Config(_))));
    }

    #[tokio::test]
    async fn test_index_collection_indexes_xml_files() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let (writer, provider) = writer();
        let indexer = indexer(dir.path());

        let update = IndexingEvent::new(IndexingEventType::UpdateCollections, None, writer.clone());
        indexer.on_event(&update).await.unwrap();

        let begin = IndexingEvent::new(
            IndexingEventType::BeginIndexingCollection,
            Some("dcc".to_string()),
            writer.clone(),
        );
        indexer.on_event(&begin).await.unwrap();

        assert_eq!(provider.num_docs().await.unwrap(), 2);
        assert!(provider.get_document("a").await.unwrap().is_some());
        assert!(provider.get_document("b").await.unwrap().is_some());
        assert!(!indexer.is_running());
    }

    #[tokio::test]
    async fn test_unknown_collection_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let (writer, provider) = writer();
        let indexer = indexer(dir.path());

        let begin = IndexingEvent::new(
            IndexingEventType::BeginIndexingCollection,
            Some("other".to_string()),
            writer,
        );
        indexer.on_event(&begin).await.unwrap();
        assert_eq!(provider.num_docs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = writer();
        let indexer = indexer(dir.path());

        let _guard = indexer.begin_run().unwrap();
        let begin = IndexingEvent::new(IndexingEventType::BeginIndexingAllCollections, None, writer);
        let result = indexer.on_event(&begin).await;
        assert!(matches!(result, Err(ListenerError::AlreadyRunning(id)) if id == "fs"));
    }

    #[tokio::test]
    async fn test_abort_stops_pass_and_keeps_old_session() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let (writer, provider) = writer();
        let indexer = indexer(dir.path());

        let update = IndexingEvent::new(IndexingEventType::UpdateCollections, None, writer.clone());
        indexer.on_event(&update).await.unwrap();

        let processor = RecordProcessor::new(writer.clone(), Arc::new(SharedFieldsConfig::empty()));
        let old = writer.new_session("dcc").unwrap();
        processor
            .index_record("<dc/>", "dcc", "old-record", &old)
            .await
            .unwrap();

        let _guard = indexer.begin_run().unwrap();
        indexer.abort_requested.store(true, Ordering::SeqCst);
        let summary = indexer
            .index_collection(&indexer.collections()[0], &processor)
            .await
            .unwrap();

        assert!(summary.aborted);
        assert_eq!(summary.indexed, 0);
        assert!(provider.get_document("old-record").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_complete_pass_removes_old_session() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let (writer, provider) = writer();
        let indexer = indexer(dir.path());

        let update = IndexingEvent::new(IndexingEventType::UpdateCollections, None, writer.clone());
        indexer.on_event(&update).await.unwrap();

        let processor = RecordProcessor::new(writer.clone(), Arc::new(SharedFieldsConfig::empty()));
        let old = writer.new_session("dcc").unwrap();
        processor
            .index_record("<dc/>", "dcc", "old-record", &old)
            .await
            .unwrap();

        let summaries = indexer.run(indexer.collections(), &writer).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].indexed, 2);
        assert_eq!(summaries[0].stale_deleted, 1);
        assert!(provider.get_document("old-record").await.unwrap().is_none());
    }
}
