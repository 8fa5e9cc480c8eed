//! Search field extraction from a parsed XML record.
//!
//! [`DocumentFieldExtractor`] turns one XML tree into the field set handed to
//! the search index. The steps always run in the same order:
//!
//! 1. Property-bag documents get one field triple per bean property.
//! 2. Every other document gets a field triple per populated element and
//!    attribute path.
//! 3. Custom fields configured for the record's format.
//! 4. Standard roles (id, url, title, description, bounding-box corners).
//! 5. Relationships.
//! 6. Steps 3 to 5 again with the root's schema location as the key, so
//!    schema rules override format rules.
//! 7. The bounding box is assembled from the captured corners.
//! 8. Standard and aggregate fields are emitted.
//!
//! Later steps override roles set by earlier ones; already emitted path fields
//! are never removed. A malformed rule drops only that rule's contribution.

mod generic;
mod result;
mod rules;

use std::sync::Arc;

use roxmltree::Document;
use tracing::debug;
use xml_indexer_shared::{BoundingBox, IndexedField};

use crate::errors::OrderingError;
use crate::fields_config::FieldExtractionConfigs;
use crate::xpath::XPathEvaluator;

pub use result::{ExtractionResult, Relationships};

use result::ResultBuilder;

/// Knobs applied before extraction.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Fold extracted text into the `default`, `stems` and `admindefault`
    /// aggregate fields.
    pub index_default_and_stems: bool,
    /// Prepended to the name of every generic path field.
    pub xpath_fields_prefix: Option<String>,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            index_default_and_stems: true,
            xpath_fields_prefix: None,
        }
    }
}

/// Caller-supplied role values; configured rules that match override them.
#[derive(Debug, Default)]
pub(crate) struct Presets {
    title: Option<String>,
    description: Option<String>,
    ids: Vec<String>,
    urls: Vec<String>,
    bounding_box: Option<BoundingBox>,
}

/// Extracts the search fields of one record.
///
/// Setters may only be called before [`extract`](Self::extract); accessors
/// only after it. Either misuse yields an [`OrderingError`].
///
/// # Example
///
/// ```
/// use roxmltree::Document;
/// use xml_indexer::extractor::DocumentFieldExtractor;
///
/// let doc = Document::parse("<a><b>hello</b></a>").unwrap();
/// let mut extractor = DocumentFieldExtractor::new(&doc, "generic", None);
/// let result = extractor.extract().unwrap();
/// assert_eq!(result.values("/text//a/b"), vec!["hello"]);
/// ```
pub struct DocumentFieldExtractor<'a, 'input> {
    evaluator: XPathEvaluator<'a, 'input>,
    format: String,
    configs: Option<Arc<FieldExtractionConfigs>>,
    options: ExtractorOptions,
    presets: Presets,
    result: Option<ExtractionResult>,
}

impl<'a, 'input> DocumentFieldExtractor<'a, 'input> {
    /// Create an extractor for a record.
    ///
    /// # Arguments
    ///
    /// * `doc` - The parsed record
    /// * `format` - The record's native format key
    /// * `configs` - Rule sets; `None` extracts generic fields only
    pub fn new(
        doc: &'a Document<'input>,
        format: impl Into<String>,
        configs: Option<Arc<FieldExtractionConfigs>>,
    ) -> Self {
        Self {
            evaluator: XPathEvaluator::new(doc),
            format: format.into(),
            configs,
            options: ExtractorOptions::default(),
            presets: Presets::default(),
            result: None,
        }
    }

    pub fn with_options(mut self, options: ExtractorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Last whitespace-separated token of the root's `schemaLocation` attribute.
    pub fn schema_location(&self) -> Option<String> {
        self.evaluator
            .document()
            .root_element()
            .attributes()
            .find(|attr| attr.name() == "schemaLocation")
            .and_then(|attr| attr.value().split_whitespace().last())
            .map(str::to_string)
    }

    pub fn set_index_default_and_stems(&mut self, enabled: bool) -> Result<(), OrderingError> {
        self.ensure_pending("index_default_and_stems")?;
        self.options.index_default_and_stems = enabled;
        Ok(())
    }

    pub fn set_xpath_fields_prefix(&mut self, prefix: Option<String>) -> Result<(), OrderingError> {
        self.ensure_pending("xpath_fields_prefix")?;
        self.options.xpath_fields_prefix = prefix;
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), OrderingError> {
        self.ensure_pending("title")?;
        self.presets.title = Some(title.into());
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), OrderingError> {
        self.ensure_pending("description")?;
        self.presets.description = Some(description.into());
        Ok(())
    }

    pub fn set_ids(&mut self, ids: Vec<String>) -> Result<(), OrderingError> {
        self.ensure_pending("ids")?;
        self.presets.ids = ids;
        Ok(())
    }

    pub fn set_urls(&mut self, urls: Vec<String>) -> Result<(), OrderingError> {
        self.ensure_pending("urls")?;
        self.presets.urls = urls;
        Ok(())
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) -> Result<(), OrderingError> {
        self.ensure_pending("bounding_box")?;
        self.presets.bounding_box = Some(bounding_box);
        Ok(())
    }

    /// Run every extraction step.
    ///
    /// # Returns
    ///
    /// * `Ok(&ExtractionResult)` - The extracted fields and derived values
    /// * `Err(OrderingError::AlreadyExtracted)` - If called a second time
    pub fn extract(&mut self) -> Result<&ExtractionResult, OrderingError> {
        self.ensure_pending("extract")?;

        let mut builder = ResultBuilder::new(self.options.clone(), std::mem::take(&mut self.presets));
        let root = self.evaluator.document().root_element();

        if generic::is_java_bean(root) {
            generic::index_bean_fields(root, &mut builder);
        } else {
            generic::index_path_fields(root, &mut builder);
        }

        if let Some(configs) = &self.configs {
            let mut keys = vec![self.format.clone()];
            keys.extend(self.schema_location());
            for key in &keys {
                if let Some(config) = configs.get_config(key) {
                    rules::apply(&self.evaluator, key, config, &mut builder);
                }
            }
        }

        builder.assemble_bounding_box();
        let result = builder.finish();

        debug!(
            format = %self.format,
            id = result.primary_id().unwrap_or_default(),
            fields = result.fields.len(),
            rule_errors = result.rule_errors.len(),
            "Extracted record fields"
        );
        Ok(&*self.result.insert(result))
    }

    pub fn is_extracted(&self) -> bool {
        self.result.is_some()
    }

    /// The full result.
    pub fn result(&self) -> Result<&ExtractionResult, OrderingError> {
        self.result.as_ref().ok_or(OrderingError::NotExtracted("result"))
    }

    pub fn into_result(self) -> Result<ExtractionResult, OrderingError> {
        self.result.ok_or(OrderingError::NotExtracted("result"))
    }

    pub fn fields(&self) -> Result<&[IndexedField], OrderingError> {
        self.completed("fields").map(|r| r.fields.as_slice())
    }

    pub fn title(&self) -> Result<Option<&str>, OrderingError> {
        self.completed("title").map(|r| r.title.as_deref())
    }

    pub fn description(&self) -> Result<Option<&str>, OrderingError> {
        self.completed("description").map(|r| r.description.as_deref())
    }

    pub fn ids(&self) -> Result<&[String], OrderingError> {
        self.completed("ids").map(|r| r.ids.as_slice())
    }

    pub fn urls(&self) -> Result<&[String], OrderingError> {
        self.completed("urls").map(|r| r.urls.as_slice())
    }

    pub fn bounding_box(&self) -> Result<Option<&BoundingBox>, OrderingError> {
        self.completed("bounding_box").map(|r| r.bounding_box.as_ref())
    }

    pub fn relationships(&self) -> Result<&Relationships, OrderingError> {
        self.completed("relationships").map(|r| &r.relationships)
    }

    pub fn full_element_text(&self) -> Result<&str, OrderingError> {
        self.completed("full_element_text").map(|r| r.full_element_text.as_str())
    }

    pub fn full_attribute_text(&self) -> Result<&str, OrderingError> {
        self.completed("full_attribute_text").map(|r| r.full_attribute_text.as_str())
    }

    fn completed(&self, what: &'static str) -> Result<&ExtractionResult, OrderingError> {
        self.result.as_ref().ok_or(OrderingError::NotExtracted(what))
    }

    fn ensure_pending(&self, what: &'static str) -> Result<(), OrderingError> {
        match self.result {
            Some(_) => Err(OrderingError::AlreadyExtracted(what)),
            None => Ok(()),
        }
    }
}
