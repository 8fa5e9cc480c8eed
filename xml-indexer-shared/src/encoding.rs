//! Value encoders used when building index fields.

/// Encode a string so that it is indexed as a single term.
///
/// Letters and digits are kept; every other character, including whitespace,
/// becomes `x` followed by its decimal code point. The result is lowercased.
/// The encoding is one-way, so the raw value must be stored separately when it
/// needs to be displayed.
///
/// # Example
///
/// ```
/// use xml_indexer_shared::encoding::encode_to_term;
///
/// assert_eq!(encode_to_term("DLESE-000-001"), "dlesex45000x45001");
/// ```
pub fn encode_to_term(value: &str) -> String {
    encode(value, true)
}

/// Same as [`encode_to_term`] but leaves the `*` wildcard unencoded.
pub fn encode_to_wildcard_term(value: &str) -> String {
    encode(value, false)
}

fn encode(value: &str, encode_wildcards: bool) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !encode_wildcards && c == '*' {
            out.push('*');
        } else {
            out.push('x');
            out.push_str(&(c as u32).to_string());
        }
    }
    out.to_lowercase()
}

/// Split a URI into whitespace-separated words for full-text indexing.
pub fn tokenize_uri(uri: &str) -> String {
    uri.chars()
        .map(|c| match c {
            '/' | ' ' | '?' | '=' | '.' | '&' | ':' => ' ',
            other => other,
        })
        .collect()
}

/// Encode a latitude as a fixed-width, lexicographically sortable term.
pub fn encode_latitude(latitude: f64) -> String {
    format!("{:010.6}", latitude + 90.0)
}

/// Encode a longitude as a fixed-width, lexicographically sortable term.
pub fn encode_longitude(longitude: f64) -> String {
    format!("{:010.6}", longitude + 180.0)
}
