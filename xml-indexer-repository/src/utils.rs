//! Utility functions for the XML indexer repository.

use crate::errors::SearchIndexError;

/// Validate that a required identifier is present.
///
/// Identifiers (record ids, collection keys) must be non-empty after trimming
/// and must not contain whitespace, since they end up as single index terms.
///
/// # Arguments
///
/// * `field_name` - Name of the identifier, used in the error message
/// * `value` - The identifier
///
/// # Example
///
/// ```
/// use xml_indexer_repository::validate_identifier;
///
/// assert!(validate_identifier("collection_key", "dcc").is_ok());
/// assert!(validate_identifier("collection_key", " ").is_err());
/// ```
pub fn validate_identifier(field_name: &str, value: &str) -> Result<(), SearchIndexError> {
    if value.trim().is_empty() {
        return Err(SearchIndexError::validation(format!(
            "{} is required",
            field_name
        )));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(SearchIndexError::validation(format!(
            "{} must not contain whitespace: '{}'",
            field_name, value
        )));
    }
    Ok(())
}
