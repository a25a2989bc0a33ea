//! Turning declared fields into remote fields
//!
//! Every field is checked even after an earlier one failed, so the host
//! sees all problems of a field list at once.

use crate::diagnostic::{Diagnostic, PathStep};
use crate::fields::{FieldSpec, ItemsSpec};
use cmakit::{ArrayItem, Field, Validation};
use std::collections::HashSet;
use thiserror::Error;

/// Problems found in a declared field list
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A rule is not a JSON object
    #[error("validation format is invalid.")]
    InvalidRule {
        /// Position of the rule within its list
        rule: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Two fields share an id
    #[error("duplicate field id \"{0}\"")]
    DuplicateId(String),
}

impl ValidationError {
    /// Diagnostic addressed at `path`
    pub fn to_diagnostic(&self, path: Vec<PathStep>) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string()).at(path);
        match self {
            Self::InvalidRule { rule, source } => {
                diagnostic.with_detail(format!("rule {rule}: {source}"))
            }
            Self::DuplicateId(_) => diagnostic,
        }
    }
}

/// Parse JSON rules in order, stopping at the first invalid one.
pub fn parse_rules(raw: &[String]) -> Result<Vec<Validation>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(rule, text)| {
            Validation::from_json(text).map_err(|source| ValidationError::InvalidRule { rule, source })
        })
        .collect()
}

/// Build remote fields from declared ones.
///
/// Rule errors are addressed `field[i].validations` or
/// `field[i].items[0].validations`; duplicate ids `field[i].id`.
pub fn build_fields(specs: &[FieldSpec]) -> Result<Vec<Field>, Vec<Diagnostic>> {
    let mut fields = Vec::with_capacity(specs.len());
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        let base = || vec![PathStep::attr("field"), PathStep::index(index as i64)];

        if !seen.insert(spec.id.as_str()) {
            let mut path = base();
            path.push(PathStep::attr("id"));
            diagnostics.push(ValidationError::DuplicateId(spec.id.clone()).to_diagnostic(path));
        }

        let validations = parse_rules(&spec.validations).unwrap_or_else(|err| {
            let mut path = base();
            path.push(PathStep::attr("validations"));
            diagnostics.push(err.to_diagnostic(path));
            Vec::new()
        });

        let items = spec.items.as_ref().map(|items| {
            build_items(items).unwrap_or_else(|err| {
                let mut path = base();
                path.extend([
                    PathStep::attr("items"),
                    PathStep::index(0),
                    PathStep::attr("validations"),
                ]);
                diagnostics.push(err.to_diagnostic(path));
                ArrayItem {
                    item_type: items.item_type.clone(),
                    link_type: items.link_type.clone(),
                    validations: Vec::new(),
                }
            })
        });

        fields.push(Field {
            id: spec.id.clone(),
            name: spec.name.clone(),
            field_type: spec.field_type.clone(),
            link_type: spec.link_type.clone(),
            items,
            required: spec.required,
            localized: spec.localized,
            disabled: spec.disabled,
            omitted: spec.omitted,
            validations,
        });
    }

    if diagnostics.is_empty() {
        Ok(fields)
    } else {
        Err(diagnostics)
    }
}

fn build_items(items: &ItemsSpec) -> Result<ArrayItem, ValidationError> {
    Ok(ArrayItem {
        item_type: items.item_type.clone(),
        link_type: items.link_type.clone(),
        validations: parse_rules(&items.validations)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::format_path;

    fn spec_with_rules(id: &str, rules: &[&str]) -> FieldSpec {
        FieldSpec {
            validations: rules.iter().map(ToString::to_string).collect(),
            ..FieldSpec::new(id, id, "Symbol")
        }
    }

    #[test]
    fn test_valid_fields_are_built() {
        let specs = vec![
            spec_with_rules("title", &[r#"{"size": {"max": 80}}"#, r#"{"unique": true}"#]),
            FieldSpec {
                items: Some(ItemsSpec {
                    item_type: "Link".to_string(),
                    link_type: Some("Entry".to_string()),
                    validations: vec![r#"{"linkContentType": ["post"]}"#.to_string()],
                }),
                ..FieldSpec::new("related", "Related", "Array")
            },
        ];

        let fields = build_fields(&specs).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].validations.len(), 2);
        assert!(fields[0].validations[0].0.contains_key("size"));
        let items = fields[1].items.as_ref().unwrap();
        assert_eq!(items.link_type.as_deref(), Some("Entry"));
        assert_eq!(items.validations.len(), 1);
    }

    #[test]
    fn test_errors_accumulate_across_fields() {
        let specs = vec![
            spec_with_rules("title", &["not json"]),
            spec_with_rules("slug", &[r#"{"unique": true}"#]),
            FieldSpec {
                items: Some(ItemsSpec {
                    item_type: "Symbol".to_string(),
                    link_type: None,
                    validations: vec![r#"["in", "a"]"#.to_string()],
                }),
                ..FieldSpec::new("tags", "Tags", "Array")
            },
        ];

        let diagnostics = build_fields(&specs).unwrap_err();

        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.summary == "validation format is invalid.")
        );
        assert_eq!(format_path(&diagnostics[0].attribute_path), "field[0].validations");
        assert_eq!(
            format_path(&diagnostics[1].attribute_path),
            "field[2].items[0].validations"
        );
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let specs = vec![
            FieldSpec::new("title", "Title", "Symbol"),
            FieldSpec::new("title", "Again", "Text"),
        ];

        let diagnostics = build_fields(&specs).unwrap_err();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(format_path(&diagnostics[0].attribute_path), "field[1].id");
    }
}
