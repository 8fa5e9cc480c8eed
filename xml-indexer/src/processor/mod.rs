//! Processor module for the XML indexer.
//!
//! Turns record XML into index documents.

mod record_processor;

pub use record_processor::{ProcessedRecord, RecordProcessor};
