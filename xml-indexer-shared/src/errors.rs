//! Error types for the shared data structures.

use thiserror::Error;

/// A bounding box coordinate failed validation.
///
/// Only the bounding box of the record being indexed is affected; callers
/// treat this as a warning and continue with the rest of the record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A coordinate is outside its allowed range.
    #[error("{field} coordinate must be between {min} and {max} but was {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The northern latitude lies south of the southern latitude.
    #[error("North coordinate {north} must not be less than South coordinate {south}")]
    NorthBelowSouth { north: f64, south: f64 },
}
