//! Fields derived from the document structure alone.

use roxmltree::Node;
use xml_indexer_shared::{fields, IndexedField};

use super::result::ResultBuilder;
use crate::xpath::direct_text;

const BEAN_ROOT: &str = "java";
const BEAN_DECODER_CLASS: &str = "java.beans.XMLDecoder";

/// Whether the root element is an encoded property bag.
pub(super) fn is_java_bean(root: Node<'_, '_>) -> bool {
    root.tag_name().name() == BEAN_ROOT && root.attribute("class") == Some(BEAN_DECODER_CLASS)
}

/// Emit one field triple per non-empty string value of each bean property.
pub(super) fn index_bean_fields(root: Node<'_, '_>, builder: &mut ResultBuilder) {
    builder.mark_java_bean();

    let bean_class = root
        .children()
        .find(|n| is_named(*n, "object"))
        .and_then(|object| object.attribute("class"))
        .map(str::trim)
        .filter(|class| !class.is_empty());
    if let Some(class) = bean_class {
        builder.push(IndexedField::stored_key(fields::JAVA_BEAN_CLASS, class));
    }
    builder.push(IndexedField::key(fields::IS_JAVA_BEAN, "true"));

    for property in root.descendants().filter(|n| is_named(*n, "void")) {
        let Some(name) = property.attribute("property") else {
            continue;
        };
        for string in property.descendants().skip(1).filter(|n| is_named(*n, "string")) {
            let value = direct_text(string);
            let value = value.trim();
            if !value.is_empty() {
                builder.add_bean_property(name, value);
            }
        }
    }
}

/// Emit a field triple for every element and attribute with a non-empty value.
pub(super) fn index_path_fields(root: Node<'_, '_>, builder: &mut ResultBuilder) {
    for element in root.descendants().filter(|n| n.is_element()) {
        let path = element_path(element);

        let text = direct_text(element);
        let text = text.trim();
        if !text.is_empty() {
            builder.add_element_value(&path, text);
        }

        for attr in element.attributes() {
            let value = attr.value().trim();
            if !value.is_empty() {
                builder.add_attribute_value(&format!("{}/@{}", path, attr.name()), value);
            }
        }
    }
}

/// `/a/b/c` path of an element, using local names.
pub(super) fn element_path(element: Node<'_, '_>) -> String {
    let mut names: Vec<&str> = element
        .ancestors()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    names.reverse();
    format!("/{}", names.join("/"))
}

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}
