//! # XML Indexer Shared
//!
//! This crate defines shared data structures and types used across the XML indexer ecosystem.
//! It includes the geospatial bounding box, the field unit handed to the search index,
//! indexing sessions, well-known field names and the term encoders.

pub mod encoding;
pub mod errors;
pub mod fields;
pub mod types;

pub use errors::ValidationError;
pub use types::{AnalyzerCategory, BoundingBox, IndexedField, IndexingSession, SessionClock};
