//! Field-set migration planning
//!
//! The remote refuses to delete a field or change its type in place: the
//! field must first be omitted and the omission activated. [`plan`] derives
//! the intermediate field lists that satisfy this rule, and [`schedule`]
//! orders every list a content-type update has to upsert and activate.

use cmakit::Field;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Declared field of a content type
///
/// Validation rules are JSON text and only become [`cmakit::Validation`]s
/// once parsed by [`crate::validation::build_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSpec>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub omitted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<String>,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type: field_type.into(),
            link_type: None,
            items: None,
            required: false,
            localized: false,
            disabled: false,
            omitted: false,
            validations: Vec::new(),
        }
    }
}

/// Declared element type of an array field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsSpec {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<String>,
}

/// Intermediate field lists for one content-type update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPlan {
    /// Removed and retyped fields omitted, everything else carried forward
    pub first_pass: Vec<Field>,
    /// Removed and retyped fields dropped
    pub second_pass: Vec<Field>,
    /// Whether any field was removed or retyped
    pub needs_second_pass: bool,
}

/// Compute the omission passes that migrate `old` towards `new`.
///
/// For each old field, in order:
/// - absent from `new`, or present with a different type: omitted in the
///   first pass and excluded from the second
/// - present with the same type: carried into both passes with the new
///   attributes, keeping the old `id`, `type` and `omitted` flag
///
/// Fields only present in `new` are inserted into both passes at their
/// position in `new`.
pub fn plan(old: &[Field], new: &[Field]) -> FieldPlan {
    let desired: HashMap<&str, &Field> = new.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut first_pass = Vec::with_capacity(old.len() + new.len());
    let mut second_pass = Vec::with_capacity(old.len() + new.len());
    let mut needs_second_pass = false;

    for field in old {
        match desired.get(field.id.as_str()) {
            Some(next) if next.field_type == field.field_type => {
                let carried = carry(field, next);
                first_pass.push(carried.clone());
                second_pass.push(carried);
            }
            _ => {
                needs_second_pass = true;
                first_pass.push(Field {
                    omitted: true,
                    ..field.clone()
                });
            }
        }
    }

    let existing: HashSet<&str> = old.iter().map(|f| f.id.as_str()).collect();
    for (index, field) in new.iter().enumerate() {
        if existing.contains(field.id.as_str()) {
            continue;
        }
        first_pass.insert(index.min(first_pass.len()), field.clone());
        second_pass.insert(index.min(second_pass.len()), field.clone());
    }

    FieldPlan {
        first_pass,
        second_pass,
        needs_second_pass,
    }
}

fn carry(old: &Field, new: &Field) -> Field {
    Field {
        id: old.id.clone(),
        field_type: old.field_type.clone(),
        omitted: old.omitted,
        ..new.clone()
    }
}

/// Kind of field list written to the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Removed and retyped fields marked omitted
    Omission,
    /// Removed and retyped fields dropped
    Removal,
    /// The literal desired field list
    Final,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Omission => write!(f, "omission"),
            Self::Removal => write!(f, "removal"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// One field list to upsert and activate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    pub kind: PassKind,
    pub fields: Vec<Field>,
}

/// Ordered field lists a content-type update writes.
///
/// The omission passes run only when the live list is non-empty and differs
/// from the desired one. The final pass always runs, even when it repeats
/// the previous write.
pub fn schedule(live: &[Field], desired: &[Field]) -> Vec<Pass> {
    let mut passes = Vec::with_capacity(3);

    if !live.is_empty() && live != desired {
        let plan = plan(live, desired);
        passes.push(Pass {
            kind: PassKind::Omission,
            fields: plan.first_pass,
        });
        if plan.needs_second_pass {
            passes.push(Pass {
                kind: PassKind::Removal,
                fields: plan.second_pass,
            });
        }
    }

    passes.push(Pass {
        kind: PassKind::Final,
        fields: desired.to_vec(),
    });
    passes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, field_type: &str) -> Field {
        Field::new(id, id.to_uppercase(), field_type)
    }

    fn ids(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_removed_field_is_omitted_then_dropped() {
        let old = vec![field("title", "Symbol"), field("body", "Text")];
        let new = vec![field("title", "Symbol")];

        let plan = plan(&old, &new);

        assert!(plan.needs_second_pass);
        assert_eq!(ids(&plan.first_pass), vec!["title", "body"]);
        assert!(plan.first_pass[1].omitted);
        assert!(!plan.first_pass[0].omitted);
        assert_eq!(plan.second_pass, new);
    }

    #[test]
    fn test_retyped_field_is_treated_as_delete_and_recreate() {
        let old = vec![field("count", "Symbol")];
        let new = vec![field("count", "Integer")];

        let plan = plan(&old, &new);

        assert!(plan.needs_second_pass);
        assert_eq!(plan.first_pass.len(), 1);
        assert!(plan.first_pass[0].omitted);
        assert_eq!(plan.first_pass[0].field_type, "Symbol");
        assert!(plan.second_pass.is_empty());
    }

    #[test]
    fn test_carried_field_takes_new_attributes() {
        let mut old_title = field("title", "Symbol");
        old_title.omitted = true;
        let mut new_title = Field::new("title", "Headline", "Symbol");
        new_title.required = true;
        new_title.localized = true;

        let plan = plan(&[old_title], &[new_title]);

        assert!(!plan.needs_second_pass);
        let carried = &plan.first_pass[0];
        assert_eq!(carried.name, "Headline");
        assert!(carried.required);
        assert!(carried.localized);
        assert!(carried.omitted, "omitted flag keeps its old value");
        assert_eq!(plan.first_pass, plan.second_pass);
    }

    #[test]
    fn test_unchanged_list_is_idempotent() {
        let old = vec![field("title", "Symbol"), field("body", "Text")];

        let plan = plan(&old, &old);

        assert_eq!(plan.first_pass, old);
        assert_eq!(plan.second_pass, old);
        assert!(!plan.needs_second_pass);
    }

    #[test]
    fn test_additions_keep_their_position() {
        let old = vec![field("title", "Symbol"), field("body", "Text")];
        let new = vec![
            field("slug", "Symbol"),
            field("title", "Symbol"),
            field("body", "Text"),
            field("tags", "Array"),
        ];

        let plan = plan(&old, &new);

        assert!(!plan.needs_second_pass);
        assert_eq!(ids(&plan.first_pass), vec!["slug", "title", "body", "tags"]);
        assert_eq!(plan.second_pass, new);
    }

    #[test]
    fn test_schedule_passes() {
        let old = vec![field("title", "Symbol"), field("body", "Text")];

        let kinds = |passes: Vec<Pass>| passes.into_iter().map(|p| p.kind).collect::<Vec<_>>();

        // creation
        assert_eq!(kinds(schedule(&[], &old)), vec![PassKind::Final]);
        // no change still writes the final pass
        assert_eq!(kinds(schedule(&old, &old)), vec![PassKind::Final]);
        // attribute change only
        let renamed = vec![Field::new("title", "Name", "Symbol"), field("body", "Text")];
        assert_eq!(
            kinds(schedule(&old, &renamed)),
            vec![PassKind::Omission, PassKind::Final]
        );
        // removal
        let passes = schedule(&old, &old[..1]);
        assert_eq!(
            passes.iter().map(|p| p.kind).collect::<Vec<_>>(),
            vec![PassKind::Omission, PassKind::Removal, PassKind::Final]
        );
        assert_eq!(passes[2].fields, old[..1].to_vec());
    }
}
