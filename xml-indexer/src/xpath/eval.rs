//! Evaluation of rule expressions against one record.

use roxmltree::{Document, NodeType};
use sxd_document::dom::{self, ChildOfElement};
use sxd_document::Package;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Value};

use super::{XPath, XPathError};

/// Evaluates expressions against one parsed record.
///
/// Building the evaluator copies the record into a localized tree once, so an
/// evaluator should be reused for every rule run against the same record.
pub struct XPathEvaluator<'a, 'input> {
    doc: &'a Document<'input>,
    localized: Package,
}

impl<'a, 'input> XPathEvaluator<'a, 'input> {
    pub fn new(doc: &'a Document<'input>) -> Self {
        Self {
            doc,
            localized: localize(doc),
        }
    }

    pub fn document(&self) -> &'a Document<'input> {
        self.doc
    }

    /// Values produced by `xpath`, untrimmed. Node sets come back in document
    /// order.
    pub fn select(&self, xpath: &XPath) -> Result<Vec<String>, XPathError> {
        let compiled = xpath.build()?;
        let document = self.localized.as_document();
        let context = Context::new();
        let value = compiled
            .evaluate(&context, document.root())
            .map_err(|e| XPathError::new(xpath.expression(), e.to_string()))?;

        Ok(match value {
            Value::Nodeset(nodes) => nodes.document_order().into_iter().map(node_text).collect(),
            Value::String(text) => vec![text],
            Value::Number(number) => vec![number_text(number)],
            Value::Boolean(flag) => vec![flag.to_string()],
        })
    }
}

fn node_text(node: Node<'_>) -> String {
    match node {
        Node::Element(element) => element
            .children()
            .into_iter()
            .filter_map(|child| match child {
                ChildOfElement::Text(text) => Some(text.text().to_string()),
                _ => None,
            })
            .collect(),
        Node::Attribute(attribute) => attribute.value().to_string(),
        Node::Text(text) => text.text().to_string(),
        other => other.string_value(),
    }
}

fn number_text(number: f64) -> String {
    match number {
        n if n == f64::INFINITY => "Infinity".to_string(),
        n if n == f64::NEG_INFINITY => "-Infinity".to_string(),
        n => n.to_string(),
    }
}

/// Copy `doc` into an `sxd-document` package with namespaces stripped.
fn localize(doc: &Document<'_>) -> Package {
    let package = Package::new();
    {
        let target = package.as_document();
        let root = target.root();
        for child in doc.root().children() {
            match child.node_type() {
                NodeType::Element => root.append_child(copy_element(&target, child)),
                NodeType::Comment => {
                    root.append_child(target.create_comment(child.text().unwrap_or_default()))
                }
                NodeType::PI => {
                    if let Some(pi) = child.pi() {
                        root.append_child(target.create_processing_instruction(pi.target, pi.value))
                    }
                }
                NodeType::Root | NodeType::Text => {}
            }
        }
    }
    package
}

fn copy_element<'d>(target: &dom::Document<'d>, source: roxmltree::Node<'_, '_>) -> dom::Element<'d> {
    let element = target.create_element(source.tag_name().name());
    for attr in source.attributes() {
        element.set_attribute_value(attr.name(), attr.value());
    }
    for child in source.children() {
        match child.node_type() {
            NodeType::Element => element.append_child(copy_element(target, child)),
            NodeType::Text => element.append_child(target.create_text(child.text().unwrap_or_default())),
            NodeType::Comment => {
                element.append_child(target.create_comment(child.text().unwrap_or_default()))
            }
            NodeType::PI => {
                if let Some(pi) = child.pi() {
                    element.append_child(target.create_processing_instruction(pi.target, pi.value))
                }
            }
            NodeType::Root => {}
        }
    }
    element
}
