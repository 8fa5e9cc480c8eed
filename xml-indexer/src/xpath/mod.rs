//! XPath 1.0 evaluation for field rules.
//!
//! Records are parsed with `roxmltree`. Rules run against a localized copy of
//! the record built for `sxd-xpath`: every element and attribute keeps only
//! its local name, so rules are written without namespace prefixes.
//!
//! A rule may select nodes or compute a value. Selected elements contribute
//! their own text children, attributes their value and text nodes their
//! content. String, number and boolean results contribute one value.

mod eval;

use roxmltree::Node;
use sxd_xpath::Factory;
use thiserror::Error;

pub use eval::XPathEvaluator;

/// A path expression that failed to compile or evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid xpath '{expression}': {message}")]
pub struct XPathError {
    pub expression: String,
    pub message: String,
}

impl XPathError {
    fn new(expression: &str, message: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}

/// An expression that is known to compile.
///
/// Compiled `sxd-xpath` expressions are neither `Send` nor `Sync`, so only the
/// validated text is kept and each evaluator compiles it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    expression: String,
}

impl XPath {
    /// Compile an expression.
    ///
    /// # Example
    ///
    /// ```
    /// use xml_indexer::xpath::XPath;
    ///
    /// assert!(XPath::compile("/record/general/title | //keyword[@lang='en']").is_ok());
    /// assert!(XPath::compile("normalize-space(/record/description)").is_ok());
    /// assert!(XPath::compile("/record/[").is_err());
    /// ```
    pub fn compile(expression: &str) -> Result<Self, XPathError> {
        build(expression)?;
        Ok(Self {
            expression: expression.to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn build(&self) -> Result<sxd_xpath::XPath, XPathError> {
        build(&self.expression)
    }
}

fn build(expression: &str) -> Result<sxd_xpath::XPath, XPathError> {
    Factory::new()
        .build(expression)
        .map_err(|e| XPathError::new(expression, e.to_string()))?
        .ok_or_else(|| XPathError::new(expression, "empty expression"))
}

/// Concatenation of the text nodes that are direct children of `node`.
pub fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}
