pub mod config;
pub mod diagnose;
pub mod lifecycle;
pub mod plan;

use crate::Context;
use crate::config::OutputFormat;
use crate::ui;
use anyhow::{Context as _, Result};
use reconcile::{Diagnostic, FieldSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Field list document: a bare JSON array or a `[[field]]` table list
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldDocument {
    List(Vec<FieldSpec>),
    Table {
        #[serde(default)]
        field: Vec<FieldSpec>,
    },
}

impl FieldDocument {
    fn into_fields(self) -> Vec<FieldSpec> {
        match self {
            Self::List(fields) | Self::Table { field: fields } => fields,
        }
    }
}

/// Load a field list from a .json or .toml file.
pub fn load_fields(path: &Path) -> Result<Vec<FieldSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_fields(&content, path.extension().and_then(|e| e.to_str()))
        .with_context(|| format!("Invalid field list in {}", path.display()))
}

fn parse_fields(content: &str, extension: Option<&str>) -> Result<Vec<FieldSpec>> {
    let document: FieldDocument = match extension {
        Some("toml") => toml::from_str(content)?,
        _ => serde_json::from_str(content)?,
    };
    Ok(document.into_fields())
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print diagnostics in the configured output format.
pub fn print_diagnostics(ctx: &Context, diagnostics: &[Diagnostic]) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => print_json(diagnostics),
        OutputFormat::Text => {
            for diagnostic in diagnostics {
                ui::diagnostic(diagnostic);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let fields = parse_fields(
            r#"[{"id": "title", "name": "Title", "type": "Symbol", "required": true}]"#,
            Some("json"),
        )
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].required);
    }

    #[test]
    fn test_parse_toml_field_tables() {
        let fields = parse_fields(
            r#"
[[field]]
id = "title"
name = "Title"
type = "Symbol"

[[field]]
id = "tags"
name = "Tags"
type = "Array"
items = { type = "Symbol", validations = ['{"size": {"max": 5}}'] }
"#,
            Some("toml"),
        )
        .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].items.as_ref().unwrap().validations.len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse_fields("{", None).is_err());
    }
}
