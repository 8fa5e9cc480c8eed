//! This module defines the core data structures and types used across the XML indexer.
//! It re-exports specific types like `BoundingBox` and `IndexedField`.

pub mod bounding_box;
pub mod indexed_field;
pub mod indexing_session;

pub use bounding_box::BoundingBox;
pub use indexed_field::{AnalyzerCategory, IndexedField};
pub use indexing_session::{IndexingSession, SessionClock};
