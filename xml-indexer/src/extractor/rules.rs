//! Configured rules: custom fields, standard roles and relationships.

use tracing::debug;

use super::result::{Relationships, ResultBuilder};
use crate::errors::ExtractionError;
use crate::fields_config::{FieldExtractionConfig, RelationKind, RuleXPath, StandardRole};
use crate::xpath::{XPathError, XPathEvaluator};

/// Apply every rule of one format or schema configuration.
pub(super) fn apply(
    evaluator: &XPathEvaluator<'_, '_>,
    key: &str,
    config: &FieldExtractionConfig,
    builder: &mut ResultBuilder,
) {
    apply_custom_fields(evaluator, key, config, builder);
    apply_standard_fields(evaluator, key, config, builder);
    apply_relationships(evaluator, key, config, builder);
}

/// Trimmed, non-empty values selected by every xpath of a rule.
fn select_all<'r>(
    evaluator: &XPathEvaluator<'_, '_>,
    xpaths: impl IntoIterator<Item = &'r RuleXPath>,
) -> Result<Vec<String>, XPathError> {
    let mut values = Vec::new();
    for xpath in xpaths {
        let compiled = xpath.compiled()?;
        values.extend(
            evaluator
                .select(compiled)?
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        );
    }
    Ok(values)
}

fn apply_custom_fields(
    evaluator: &XPathEvaluator<'_, '_>,
    key: &str,
    config: &FieldExtractionConfig,
    builder: &mut ResultBuilder,
) {
    for rule in &config.custom_fields {
        match select_all(evaluator, &rule.xpaths) {
            Ok(values) => {
                for value in values {
                    builder.add_custom_value(&rule.name, &value, rule.store, rule.analyzer);
                }
            }
            Err(source) => builder.rule_error(ExtractionError::CustomField {
                field: rule.name.clone(),
                key: key.to_string(),
                source,
            }),
        }
    }
}

fn apply_standard_fields(
    evaluator: &XPathEvaluator<'_, '_>,
    key: &str,
    config: &FieldExtractionConfig,
    builder: &mut ResultBuilder,
) {
    for rule in &config.standard_fields {
        let values = match select_all(evaluator, &rule.xpaths) {
            Ok(values) => values,
            Err(source) => {
                builder.rule_error(ExtractionError::StandardField {
                    field: rule.role.as_str().to_string(),
                    key: key.to_string(),
                    source,
                });
                continue;
            }
        };
        if values.is_empty() {
            continue;
        }

        match rule.role {
            StandardRole::Id => builder.ids = values,
            StandardRole::Url => builder.urls = values,
            StandardRole::Title => builder.title = Some(space_join(&values)),
            StandardRole::Description => builder.description = Some(space_join(&values)),
            StandardRole::North | StandardRole::South | StandardRole::East | StandardRole::West => {
                builder.set_corner(rule.role, &values)
            }
        }
    }
}

/// Each value preceded by a single space, leading separator included.
fn space_join(values: &[String]) -> String {
    values.iter().map(|v| format!(" {}", v)).collect()
}

fn apply_relationships(
    evaluator: &XPathEvaluator<'_, '_>,
    key: &str,
    config: &FieldExtractionConfig,
    builder: &mut ResultBuilder,
) {
    let mut found = Relationships::default();

    for rule in &config.relationships {
        let mut hits: Vec<(RelationKind, String)> = Vec::new();
        let mut failed = false;
        for path in &rule.xpaths {
            match select_all(evaluator, std::iter::once(&path.xpath)) {
                Ok(values) => hits.extend(values.into_iter().map(|v| (path.kind, v))),
                Err(source) => {
                    builder.rule_error(ExtractionError::Relationship {
                        relation: rule.name.clone(),
                        key: key.to_string(),
                        source,
                    });
                    failed = true;
                    break;
                }
            }
        }
        if failed {
            continue;
        }

        for (kind, value) in hits {
            let (map, list) = match kind {
                RelationKind::Id => (&mut found.ids_by_relation, &mut found.related_ids),
                RelationKind::Url => (&mut found.urls_by_relation, &mut found.related_urls),
            };
            map.entry(rule.name.clone()).or_default().push(value.clone());
            list.push(value);
        }
    }

    debug!(
        key = %key,
        related_ids = found.related_ids.len(),
        related_urls = found.related_urls.len(),
        "Extracted relationships"
    );
    builder.relationships.override_with(found);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_join_keeps_leading_separator() {
        let values = vec!["Foo".to_string(), "Bar".to_string()];
        assert_eq!(space_join(&values), " Foo Bar");
    }
}
