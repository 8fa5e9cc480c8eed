//! Loading rule sets from the index-of-configuration-files document.
//!
//! Index document:
//!
//! ```xml
//! <XMLIndexerFieldsConfigIndex>
//!   <configurationFiles>
//!     <configurationFile>adn/adn_fields.xml</configurationFile>
//!   </configurationFiles>
//! </XMLIndexerFieldsConfigIndex>
//! ```
//!
//! Listed paths are relative to the index document's directory. Each listed
//! file has an `XMLIndexerFieldsConfig` root carrying an `xmlFormat` and/or a
//! `schema` attribute.

use std::path::Path;

use roxmltree::{Document, Node};
use tokio::fs;
use tracing::{debug, info, warn};
use xml_indexer_shared::AnalyzerCategory;

use super::{
    CustomFieldRule, FieldExtractionConfig, FieldExtractionConfigs, RelationKind,
    RelationshipPath, RelationshipRule, RuleXPath, StandardFieldRule, StandardRole,
};
use crate::errors::ConfigError;

const CONFIG_ROOT: &str = "XMLIndexerFieldsConfig";

impl FieldExtractionConfigs {
    /// Load every configuration file listed in an index document.
    ///
    /// A file that fails to load is logged and recorded in
    /// [`load_errors`](Self::load_errors); the remaining files still load.
    ///
    /// # Returns
    ///
    /// * `Ok(FieldExtractionConfigs)` - The loaded set
    /// * `Err(ConfigError)` - Only if the index document itself is unusable
    pub async fn load(index_file: &Path) -> Result<Self, ConfigError> {
        let index_label = index_file.display().to_string();
        let index_xml = fs::read_to_string(index_file)
            .await
            .map_err(|e| ConfigError::read(&index_label, e.to_string()))?;
        let listed = listed_files(&index_label, &index_xml)?;

        let base_dir = index_file.parent().unwrap_or_else(|| Path::new("."));
        let mut configs = Self::empty();

        for relative in listed {
            let path = base_dir.join(&relative);
            let label = path.display().to_string();

            let result = match fs::read_to_string(&path).await {
                Ok(xml) => configs.add_config_document(&label, &xml),
                Err(e) => Err(ConfigError::read(&label, e.to_string())),
            };

            if let Err(e) = result {
                warn!(file = %label, error = %e, "Skipping field configuration file");
                configs.push_load_error(e);
            }
        }

        info!(
            index = %index_label,
            configured_keys = configs.keys().len(),
            failed_files = configs.load_errors().len(),
            "Loaded field extraction configuration"
        );
        Ok(configs)
    }

    /// Parse one configuration document and register it under its format
    /// and/or schema key.
    ///
    /// # Returns
    ///
    /// The keys the document was registered under.
    pub fn add_config_document(&mut self, source: &str, xml: &str) -> Result<Vec<String>, ConfigError> {
        let (keys, config) = parse_config_document(source, xml)?;
        for key in &keys {
            self.insert(key.clone(), config.clone());
        }
        debug!(source = %source, keys = ?keys, "Registered field configuration");
        Ok(keys)
    }
}

/// Non-empty `configurationFile` entries of an index document, in order.
fn listed_files(source: &str, xml: &str) -> Result<Vec<String>, ConfigError> {
    let doc = Document::parse(xml).map_err(|e| ConfigError::parse(source, e.to_string()))?;
    Ok(doc
        .root_element()
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "configurationFile")
        .map(element_text)
        .filter(|relative| !relative.is_empty())
        .collect())
}

/// Parse a single configuration document.
pub fn parse_config_document(
    source: &str,
    xml: &str,
) -> Result<(Vec<String>, FieldExtractionConfig), ConfigError> {
    let doc = Document::parse(xml).map_err(|e| ConfigError::parse(source, e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != CONFIG_ROOT {
        return Err(ConfigError::invalid_rule(
            source,
            format!(
                "root element must be '{}' but was '{}'",
                CONFIG_ROOT,
                root.tag_name().name()
            ),
        ));
    }

    let keys: Vec<String> = ["xmlFormat", "schema"]
        .iter()
        .filter_map(|attr| root.attribute(*attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if keys.is_empty() {
        return Err(ConfigError::invalid_rule(
            source,
            "an xmlFormat or schema attribute is required",
        ));
    }

    let mut config = FieldExtractionConfig::default();

    for field in grandchildren(root, "customFields", "customField") {
        config.custom_fields.push(parse_custom_field(source, field)?);
    }

    for field in grandchildren(root, "standardFields", "standardField") {
        let name = attr(field, "name");
        match StandardRole::from_name(&name) {
            Some(role) => config.standard_fields.push(StandardFieldRule {
                role,
                xpaths: xpaths(field).into_iter().map(|(x, _)| RuleXPath::new(x)).collect(),
            }),
            None => {
                warn!(source = %source, field = %name, "Ignoring unknown standard field");
            }
        }
    }

    for relationship in grandchildren(root, "relationships", "relationship") {
        let name = attr(relationship, "name");
        let mut paths = Vec::new();
        for (xpath, kind) in xpaths(relationship) {
            let kind = RelationKind::from_name(&kind).ok_or_else(|| {
                ConfigError::invalid_rule(
                    source,
                    format!(
                        "relationship '{}': xpath type must be either 'id' or 'url' but found: '{}'",
                        name, kind
                    ),
                )
            })?;
            paths.push(RelationshipPath {
                xpath: RuleXPath::new(xpath),
                kind,
            });
        }
        if name.is_empty() {
            debug!(source = %source, "Ignoring relationship without a name");
            continue;
        }
        config.relationships.push(RelationshipRule { name, xpaths: paths });
    }

    Ok((keys, config))
}

fn parse_custom_field(source: &str, field: Node<'_, '_>) -> Result<CustomFieldRule, ConfigError> {
    let name = attr(field, "name");
    if name.is_empty() {
        return Err(ConfigError::invalid_rule(source, "custom field without a name"));
    }

    let field_type = attr(field, "type").to_lowercase();
    let analyzer_name = attr(field, "analyzer");
    let store = !attr(field, "store").eq_ignore_ascii_case("no");

    let analyzer = match (field_type.as_str(), analyzer_name.is_empty()) {
        ("", true) => {
            return Err(ConfigError::invalid_rule(
                source,
                format!("custom field '{}' must declare a type or an analyzer", name),
            ))
        }
        ("key", _) => AnalyzerCategory::ExactKey,
        ("" | "text" | "stems", false) => AnalyzerCategory::from_analyzer_name(&analyzer_name),
        ("text", true) => AnalyzerCategory::Literal,
        ("stems", true) => AnalyzerCategory::Normalized,
        (other, _) => {
            return Err(ConfigError::invalid_rule(
                source,
                format!(
                    "custom field '{}' has unknown type '{}' (expected text, stems or key)",
                    name, other
                ),
            ))
        }
    };

    Ok(CustomFieldRule {
        xpaths: xpaths(field).into_iter().map(|(x, _)| RuleXPath::new(x)).collect(),
        name,
        store,
        analyzer,
    })
}

/// `parent/<outer>/<inner>` elements, in document order.
fn grandchildren<'a, 'input>(
    parent: Node<'a, 'input>,
    outer: &'a str,
    inner: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    children_named(parent, outer).flat_map(move |group| children_named(group, inner))
}

fn children_named<'a, 'input>(
    parent: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Non-empty `xpaths/xpath` texts with their `type` attribute.
fn xpaths(rule: Node<'_, '_>) -> Vec<(String, String)> {
    grandchildren(rule, "xpaths", "xpath")
        .map(|x| (element_text(x), attr(x, "type")))
        .filter(|(x, _)| !x.is_empty())
        .collect()
}

fn attr(node: Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or_default().trim().to_string()
}

fn element_text(node: Node<'_, '_>) -> String {
    crate::xpath::direct_text(node).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ADN_CONFIG: &str = r#"<XMLIndexerFieldsConfig xmlFormat="adn" schema="http://www.dlese.org/Metadata/adn-item/0.6.50/record.xsd">
        <customFields>
            <customField name="gradeRange" type="key" store="yes">
                <xpaths><xpath>/itemRecord/educational/audiences/audience/gradeRange</xpath></xpaths>
            </customField>
            <customField name="subject" type="stems" store="no">
                <xpaths>
                    <xpath>/itemRecord/general/subjects/subject</xpath>
                    <xpath>  </xpath>
                </xpaths>
            </customField>
            <customField name="keywordKey" analyzer="org.apache.lucene.analysis.KeywordAnalyzer">
                <xpaths><xpath>//keyword</xpath></xpaths>
            </customField>
        </customFields>
        <standardFields>
            <standardField name="id"><xpaths><xpath>/itemRecord/metaMetadata/catalogEntries/catalog/@entry</xpath></xpaths></standardField>
            <standardField name="title"><xpaths><xpath>/itemRecord/general/title</xpath></xpaths></standardField>
            <standardField name="popularity"><xpaths><xpath>/itemRecord/x</xpath></xpaths></standardField>
        </standardFields>
        <relationships>
            <relationship name="isAnnotatedBy">
                <xpaths>
                    <xpath type="id">/itemRecord/relations/relation/idEntry/@entry</xpath>
                    <xpath type="URL">/itemRecord/relations/relation/urlEntry/@url</xpath>
                </xpaths>
            </relationship>
        </relationships>
    </XMLIndexerFieldsConfig>"#;

    #[test]
    fn test_parse_full_document() {
        let (keys, config) = parse_config_document("adn.xml", ADN_CONFIG).unwrap();
        assert_eq!(
            keys,
            vec![
                "adn".to_string(),
                "http://www.dlese.org/Metadata/adn-item/0.6.50/record.xsd".to_string()
            ]
        );

        assert_eq!(config.custom_fields.len(), 3);
        let grade = &config.custom_fields[0];
        assert_eq!(grade.analyzer, AnalyzerCategory::ExactKey);
        assert!(grade.store);
        let subject = &config.custom_fields[1];
        assert_eq!(subject.analyzer, AnalyzerCategory::Normalized);
        assert!(!subject.store);
        assert_eq!(subject.xpaths.len(), 1);
        assert_eq!(config.custom_fields[2].analyzer, AnalyzerCategory::ExactKey);

        // Unknown standard role is skipped.
        assert_eq!(config.standard_fields.len(), 2);
        assert_eq!(config.standard_fields[0].role, StandardRole::Id);

        let rel = &config.relationships[0];
        assert_eq!(rel.name, "isAnnotatedBy");
        assert_eq!(rel.xpaths[0].kind, RelationKind::Id);
        assert_eq!(rel.xpaths[1].kind, RelationKind::Url);
    }

    #[test]
    fn test_custom_field_without_type_or_analyzer_fails() {
        let xml = r#"<XMLIndexerFieldsConfig xmlFormat="adn">
            <customFields><customField name="bad"><xpaths><xpath>/a</xpath></xpaths></customField></customFields>
        </XMLIndexerFieldsConfig>"#;
        let err = parse_config_document("bad.xml", xml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
        assert!(err.to_string().contains("'bad'"));
    }

    #[test]
    fn test_relationship_with_unknown_kind_fails() {
        let xml = r#"<XMLIndexerFieldsConfig xmlFormat="adn">
            <relationships><relationship name="r"><xpaths><xpath type="doi">/a</xpath></xpaths></relationship></relationships>
        </XMLIndexerFieldsConfig>"#;
        let err = parse_config_document("bad.xml", xml).unwrap_err();
        assert!(err.to_string().contains("either 'id' or 'url'"));
    }

    #[test]
    fn test_missing_key_fails() {
        let xml = "<XMLIndexerFieldsConfig/>";
        assert!(parse_config_document("nokey.xml", xml).is_err());
    }

    #[tokio::test]
    async fn test_load_continues_past_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("adn")).unwrap();
        std::fs::write(dir.path().join("adn/adn.xml"), ADN_CONFIG).unwrap();
        std::fs::write(dir.path().join("broken.xml"), "<XMLIndexerFieldsConfig").unwrap();

        let index_path = dir.path().join("index.xml");
        let mut index = std::fs::File::create(&index_path).unwrap();
        write!(
            index,
            "<XMLIndexerFieldsConfigIndex><configurationFiles>\
             <configurationFile>broken.xml</configurationFile>\
             <configurationFile>missing.xml</configurationFile>\
             <configurationFile>adn/adn.xml</configurationFile>\
             </configurationFiles></XMLIndexerFieldsConfigIndex>"
        )
        .unwrap();

        let configs = FieldExtractionConfigs::load(&index_path).await.unwrap();
        assert!(configs.is_configured("adn"));
        assert_eq!(configs.load_errors().len(), 2);
        assert_eq!(
            configs.analyzer_map().get("subject"),
            Some(&AnalyzerCategory::Normalized)
        );
    }

    #[tokio::test]
    async fn test_missing_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FieldExtractionConfigs::load(&dir.path().join("nope.xml")).await;
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
