//! Extraction output and the accumulator that builds it.

use std::collections::BTreeMap;

use tracing::warn;
use xml_indexer_shared::encoding::{encode_latitude, encode_longitude, encode_to_term, tokenize_uri};
use xml_indexer_shared::{fields, AnalyzerCategory, BoundingBox, IndexedField};

use super::ExtractorOptions;
use crate::errors::ExtractionError;
use crate::fields_config::StandardRole;

/// Relationship targets found in a record.
///
/// A relation name only has a map entry when at least one target was found
/// for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub ids_by_relation: BTreeMap<String, Vec<String>>,
    pub urls_by_relation: BTreeMap<String, Vec<String>>,
    /// Every related id, in extraction order.
    pub related_ids: Vec<String>,
    /// Every related url, in extraction order.
    pub related_urls: Vec<String>,
}

impl Relationships {
    pub fn is_empty(&self) -> bool {
        self.ids_by_relation.is_empty() && self.urls_by_relation.is_empty()
    }

    pub fn ids(&self, relation: &str) -> Option<&[String]> {
        self.ids_by_relation.get(relation).map(Vec::as_slice)
    }

    pub fn urls(&self, relation: &str) -> Option<&[String]> {
        self.urls_by_relation.get(relation).map(Vec::as_slice)
    }

    /// Replace each part that the newer run actually found.
    pub(super) fn override_with(&mut self, newer: Relationships) {
        if !newer.ids_by_relation.is_empty() {
            self.ids_by_relation = newer.ids_by_relation;
        }
        if !newer.urls_by_relation.is_empty() {
            self.urls_by_relation = newer.urls_by_relation;
        }
        if !newer.related_ids.is_empty() {
            self.related_ids = newer.related_ids;
        }
        if !newer.related_urls.is_empty() {
            self.related_urls = newer.related_urls;
        }
    }
}

/// Everything extracted from one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Every emitted field, in emission order.
    pub fields: Vec<IndexedField>,
    /// Space-joined title values. Keeps the leading separator.
    pub title: Option<String>,
    pub description: Option<String>,
    /// Record ids; the first one is the primary id.
    pub ids: Vec<String>,
    /// Resource urls; the first one is the primary url.
    pub urls: Vec<String>,
    pub bounding_box: Option<BoundingBox>,
    pub relationships: Relationships,
    /// Every element (or bean property) value, each preceded by a space.
    pub full_element_text: String,
    /// Every attribute value, each preceded by a space.
    pub full_attribute_text: String,
    pub is_java_bean: bool,
    /// Rules whose contribution was dropped.
    pub rule_errors: Vec<ExtractionError>,
    /// Non-fatal data problems, such as an unusable bounding box.
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    pub fn primary_id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    /// Values of every emitted field with this name.
    pub fn values<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.as_str())
            .collect()
    }
}

/// Raw corner strings captured from standard-role rules.
#[derive(Debug, Default)]
struct Corners {
    north: Option<String>,
    south: Option<String>,
    east: Option<String>,
    west: Option<String>,
}

impl Corners {
    fn is_empty(&self) -> bool {
        self.north.is_none() && self.south.is_none() && self.east.is_none() && self.west.is_none()
    }

    fn slot(&mut self, role: StandardRole) -> Option<&mut Option<String>> {
        match role {
            StandardRole::North => Some(&mut self.north),
            StandardRole::South => Some(&mut self.south),
            StandardRole::East => Some(&mut self.east),
            StandardRole::West => Some(&mut self.west),
            _ => None,
        }
    }

    fn parse(&self) -> Result<(f64, f64, f64, f64), String> {
        let value = |raw: &Option<String>| -> Result<f64, String> {
            let raw = raw
                .as_deref()
                .ok_or_else(|| "One or more coordinates were null or missing.".to_string())?;
            raw.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid coordinate value: '{}'", raw))
        };
        Ok((
            value(&self.north)?,
            value(&self.south)?,
            value(&self.east)?,
            value(&self.west)?,
        ))
    }
}

/// Accumulates fields and derived values while the extraction steps run.
pub(super) struct ResultBuilder {
    options: ExtractorOptions,
    fields: Vec<IndexedField>,
    folded: Vec<String>,
    full_element_text: String,
    full_attribute_text: String,
    is_java_bean: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ids: Vec<String>,
    pub urls: Vec<String>,
    corners: Corners,
    bounding_box: Option<BoundingBox>,
    pub relationships: Relationships,
    rule_errors: Vec<ExtractionError>,
    warnings: Vec<String>,
}

impl ResultBuilder {
    pub fn new(options: ExtractorOptions, presets: super::Presets) -> Self {
        Self {
            options,
            fields: Vec::new(),
            folded: Vec::new(),
            full_element_text: String::new(),
            full_attribute_text: String::new(),
            is_java_bean: false,
            title: presets.title,
            description: presets.description,
            ids: presets.ids,
            urls: presets.urls,
            corners: Corners::default(),
            bounding_box: presets.bounding_box,
            relationships: Relationships::default(),
            rule_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, field: IndexedField) {
        self.fields.push(field);
    }

    /// Queue a value for the aggregate fields, if aggregates are enabled.
    pub fn fold(&mut self, value: &str) {
        if self.options.index_default_and_stems {
            self.folded.push(value.to_string());
        }
    }

    pub fn mark_java_bean(&mut self) {
        self.is_java_bean = true;
    }

    /// Generic triple for an element path, plus its populated-path entry.
    pub fn add_element_value(&mut self, path: &str, value: &str) {
        self.add_path_fields(path, value);
        self.full_element_text.push(' ');
        self.full_element_text.push_str(value);
    }

    pub fn add_attribute_value(&mut self, path: &str, value: &str) {
        self.add_path_fields(path, value);
        self.full_attribute_text.push(' ');
        self.full_attribute_text.push_str(value);
    }

    fn add_path_fields(&mut self, path: &str, value: &str) {
        let prefix = self.options.xpath_fields_prefix.clone().unwrap_or_default();
        self.push(IndexedField::stored_text(format!("{}/text/{}", prefix, path), value));
        self.push(IndexedField::normalized(format!("{}/stems/{}", prefix, path), value));
        self.push(IndexedField::key(format!("{}/key/{}", prefix, path), value));
        self.push(IndexedField::key(fields::INDEXED_XPATHS, path));
        self.fold(value);
    }

    pub fn add_bean_property(&mut self, property: &str, value: &str) {
        let base = fields::JAVA_BEAN_PROPERTY_PREFIX;
        self.push(IndexedField::stored_text(format!("{}/text//{}", base, property), value));
        self.push(IndexedField::normalized(format!("{}/stems//{}", base, property), value));
        self.push(IndexedField::key(format!("{}/key//{}", base, property), value));
        self.fold(value);
        self.full_element_text.push(' ');
        self.full_element_text.push_str(value);
    }

    pub fn add_custom_value(&mut self, name: &str, value: &str, store: bool, analyzer: AnalyzerCategory) {
        self.push(IndexedField::new(name, value, store, analyzer));
        if analyzer != AnalyzerCategory::ExactKey {
            self.fold(value);
        }
    }

    /// Keep the first value for a bounding-box corner, warning if more were found.
    pub fn set_corner(&mut self, role: StandardRole, values: &[String]) {
        if values.len() > 1 {
            self.warn(format!(
                "{} values for field '{}' were found in the XML instance document but only 1 occurrence is allowed. Remaining value(s) were dropped.",
                values.len(),
                role.as_str()
            ));
        }
        if let (Some(slot), Some(first)) = (self.corners.slot(role), values.first()) {
            *slot = Some(first.clone());
        }
    }

    pub fn rule_error(&mut self, error: ExtractionError) {
        warn!(error = %error, "Extraction rule skipped");
        self.rule_errors.push(error);
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Build the bounding box from the captured corners.
    ///
    /// Failures are downgraded to warnings and never abort extraction.
    pub fn assemble_bounding_box(&mut self) {
        if self.corners.is_empty() {
            return;
        }

        let for_id = self
            .ids
            .first()
            .map(|id| format!(" for ID {}", id))
            .unwrap_or_default();

        match self.corners.parse() {
            Ok((north, south, east, west)) => match BoundingBox::new(north, south, east, west) {
                Ok(bb) => self.bounding_box = Some(bb),
                Err(e) => self.warn(format!("Unable to index Bounding Box coordinates{}: {}", for_id, e)),
            },
            Err(reason) => self.warn(format!(
                "Unable to index Bounding Box coordinates{}. {}",
                for_id, reason
            )),
        }
    }

    /// Emit the standard and aggregate fields and produce the result.
    pub fn finish(mut self) -> ExtractionResult {
        if let Some(title) = self.title.clone() {
            self.push(IndexedField::stored_text(fields::TITLE, title.as_str()));
            self.push(IndexedField::normalized(fields::TITLE_STEMS, title.as_str()));
            self.push(IndexedField::key(fields::TITLE_KEY, title.as_str()));
            self.fold(&title);
        }

        if let Some(description) = self.description.clone() {
            self.push(IndexedField::stored_text(fields::DESCRIPTION, description.as_str()));
            self.push(IndexedField::normalized(fields::DESCRIPTION_STEMS, description.as_str()));
            self.fold(&description);
        }

        let urls = self.urls.clone();
        if let Some(primary) = urls.first() {
            self.push(IndexedField::stored_key(fields::URL, primary.as_str()));
            // The primary url is tokenized too; `url` is an exact key and
            // would otherwise leave single-url records without url terms.
            for url in &urls {
                let tokens = tokenize_uri(url);
                self.push(IndexedField::text(fields::URI, tokens.as_str()));
                self.fold(&tokens);
            }
            let encoded: Vec<String> = urls.iter().map(|u| encode_to_term(u)).collect();
            self.push(IndexedField::text(fields::URL_ENCODED, encoded.join(" ")));
        }

        let ids = self.ids.clone();
        for id in &ids {
            self.push(IndexedField::key(fields::ID, encode_to_term(id)));
        }
        for id in &ids {
            self.push(IndexedField::stored_key(fields::ID_VALUE, id.as_str()));
        }

        let has_bounding_box = match self.bounding_box {
            Some(bb) => {
                self.push(IndexedField::stored_key(fields::NORTH_COORD, encode_latitude(bb.north())));
                self.push(IndexedField::stored_key(fields::SOUTH_COORD, encode_latitude(bb.south())));
                self.push(IndexedField::stored_key(fields::EAST_COORD, encode_longitude(bb.east())));
                self.push(IndexedField::stored_key(fields::WEST_COORD, encode_longitude(bb.west())));
                true
            }
            None => false,
        };
        self.push(IndexedField::stored_key(
            fields::HAS_BOUNDING_BOX,
            has_bounding_box.to_string(),
        ));

        for value in std::mem::take(&mut self.folded) {
            self.fields.push(IndexedField::text(fields::DEFAULT, value.as_str()));
            self.fields.push(IndexedField::normalized(fields::STEMS, value.as_str()));
            self.fields.push(IndexedField::text(fields::ADMIN_DEFAULT, value));
        }

        ExtractionResult {
            fields: self.fields,
            title: self.title,
            description: self.description,
            ids: self.ids,
            urls: self.urls,
            bounding_box: self.bounding_box,
            relationships: self.relationships,
            full_element_text: self.full_element_text,
            full_attribute_text: self.full_attribute_text,
            is_java_bean: self.is_java_bean,
            rule_errors: self.rule_errors,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractorOptions, Presets};

    #[test]
    fn test_every_url_is_tokenized_but_only_primary_is_stored() {
        let mut builder = ResultBuilder::new(ExtractorOptions::default(), Presets::default());
        builder.urls = vec![
            "http://example.org/first".to_string(),
            "http://example.org/second".to_string(),
        ];
        let result = builder.finish();

        assert_eq!(result.values(fields::URL), vec!["http://example.org/first"]);
        assert_eq!(result.values(fields::URI).len(), 2);
        assert_eq!(result.values(fields::URL_ENCODED).len(), 1);
    }
}
