//! Record processor implementation.
//!
//! Parses record XML, extracts its search fields and writes them to the index
//! under the current indexing session.

use std::sync::Arc;

use roxmltree::{Document, ParsingOptions};
use tracing::{debug, instrument};
use xml_indexer_repository::CollectionIndexWriter;
use xml_indexer_shared::IndexingSession;

use crate::errors::ProcessError;
use crate::extractor::{DocumentFieldExtractor, ExtractionResult, ExtractorOptions};
use crate::fields_config::SharedFieldsConfig;

/// A record after extraction.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    /// Id the record is indexed under: the primary extracted id, or the
    /// caller's fallback.
    pub id: String,
    pub result: ExtractionResult,
}

/// Processor that turns record XML into index documents.
///
/// The processor is responsible for:
/// - Parsing the record text
/// - Running extraction with the current configuration snapshot
/// - Writing the resulting field set tagged with the session
pub struct RecordProcessor {
    writer: Arc<CollectionIndexWriter>,
    fields_config: Arc<SharedFieldsConfig>,
    options: ExtractorOptions,
}

impl RecordProcessor {
    /// Create a new record processor.
    pub fn new(writer: Arc<CollectionIndexWriter>, fields_config: Arc<SharedFieldsConfig>) -> Self {
        Self {
            writer,
            fields_config,
            options: ExtractorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn writer(&self) -> &Arc<CollectionIndexWriter> {
        &self.writer
    }

    /// Parse and extract a record without writing it.
    ///
    /// # Arguments
    ///
    /// * `xml` - The record text
    /// * `format` - The record's native format key
    /// * `fallback_id` - Used when no id rule matches
    pub fn extract(
        &self,
        xml: &str,
        format: &str,
        fallback_id: &str,
    ) -> Result<ProcessedRecord, ProcessError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options).map_err(|e| ProcessError::Parse {
            id: fallback_id.to_string(),
            message: e.to_string(),
        })?;

        let mut extractor =
            DocumentFieldExtractor::new(&doc, format, Some(self.fields_config.snapshot()))
                .with_options(self.options.clone());
        extractor.extract()?;
        let result = extractor.into_result()?;

        let id = result
            .primary_id()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_id.to_string());
        Ok(ProcessedRecord { id, result })
    }

    /// Extract a record of a registered collection and write it to the index.
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessedRecord)` - What was written
    /// * `Err(ProcessError)` - If the record could not be parsed, the
    ///   collection is unknown or the index rejected the write
    #[instrument(skip(self, xml, session), fields(collection = %collection_key, session = %session))]
    pub async fn index_record(
        &self,
        xml: &str,
        collection_key: &str,
        fallback_id: &str,
        session: &IndexingSession,
    ) -> Result<ProcessedRecord, ProcessError> {
        let info = self
            .writer
            .collection(collection_key)
            .ok_or_else(|| ProcessError::UnknownCollection(collection_key.to_string()))?;

        let record = self.extract(xml, &info.format, fallback_id)?;
        self.writer
            .put(record.result.fields.clone(), collection_key, &record.id, session)
            .await?;

        debug!(id = %record.id, fields = record.result.fields.len(), "Indexed record");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xml_indexer_repository::{CollectionInfo, InMemoryIndexProvider, IndexingStatusLog, SearchIndexProvider};

    const CONFIG: &str = r#"<XMLIndexerFieldsConfig xmlFormat="oai_dc">
        <standardFields>
            <standardField name="id"><xpaths><xpath>/dc/identifier</xpath></xpaths></standardField>
            <standardField name="title"><xpaths><xpath>/dc/title</xpath></xpaths></standardField>
        </standardFields>
    </XMLIndexerFieldsConfig>"#;

    async fn processor() -> (RecordProcessor, Arc<InMemoryIndexProvider>) {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let writer = Arc::new(CollectionIndexWriter::new(
            provider.clone(),
            Arc::new(IndexingStatusLog::default()),
        ));
        writer
            .put_collection(CollectionInfo {
                key: "dcc".to_string(),
                format: "oai_dc".to_string(),
                name: "DCC".to_string(),
                description: String::new(),
                additional_metadata: None,
            })
            .await
            .unwrap();

        let mut configs = crate::fields_config::FieldExtractionConfigs::empty();
        configs.add_config_document("dc.xml", CONFIG).unwrap();
        let shared = Arc::new(SharedFieldsConfig::new(configs, None));
        (RecordProcessor::new(writer, shared), provider)
    }

    #[tokio::test]
    async fn test_index_record_uses_extracted_id() {
        let (processor, provider) = processor().await;
        let session = processor.writer().new_session("dcc").unwrap();

        let record = processor
            .index_record(
                "<dc><identifier>DCC-1</identifier><title>Rocks</title></dc>",
                "dcc",
                "file-name",
                &session,
            )
            .await
            .unwrap();

        assert_eq!(record.id, "DCC-1");
        let doc = provider.get_document("DCC-1").await.unwrap().unwrap();
        assert_eq!(doc.first_value("title"), Some(" Rocks"));
        assert_eq!(doc.first_value("collection"), Some("dcc"));
    }

    #[tokio::test]
    async fn test_index_record_falls_back_to_caller_id() {
        let (processor, provider) = processor().await;
        let session = processor.writer().new_session("dcc").unwrap();

        let record = processor
            .index_record("<dc><title>No id</title></dc>", "dcc", "file-name", &session)
            .await
            .unwrap();
        assert_eq!(record.id, "file-name");
        assert!(provider.get_document("file-name").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_record_is_parse_error() {
        let (processor, _) = processor().await;
        let session = processor.writer().new_session("dcc").unwrap();

        let result = processor
            .index_record("<dc><title>", "dcc", "broken", &session)
            .await;
        assert!(matches!(result, Err(ProcessError::Parse { ref id, .. }) if id == "broken"));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let (processor, _) = processor().await;
        let session = processor.writer().new_session("other").unwrap();

        let result = processor
            .index_record("<dc/>", "other", "x", &session)
            .await;
        assert!(matches!(result, Err(ProcessError::UnknownCollection(_))));
    }
}
