//! Attribute-addressed diagnostics and remote error translation
//!
//! The host reports problems against the attribute that caused them, so
//! every remote failure is turned into one or more [`Diagnostic`]s whose
//! [`PathStep`]s point into the desired attribute tree.

use cmakit::RemoteError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One step of an attribute path, root to leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathStep {
    /// Named attribute
    Attribute { name: String },
    /// Position in a list
    Index { value: i64 },
}

impl PathStep {
    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attribute { name: name.into() }
    }

    pub fn index(value: i64) -> Self {
        Self::Index { value }
    }
}

/// Render a path as `field[1].items[0].validations`.
pub fn format_path(path: &[PathStep]) -> String {
    let mut out = String::new();
    for step in path {
        match step {
            PathStep::Attribute { name } => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathStep::Index { value } => out.push_str(&format!("[{value}]")),
        }
    }
    out
}

/// A problem reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Empty when the problem is not tied to an attribute
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_path: Vec<PathStep>,
}

impl Diagnostic {
    /// Create an error diagnostic with no detail and no path
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            attribute_path: Vec::new(),
        }
    }

    /// Create a warning diagnostic with no detail and no path
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn at(mut self, path: Vec<PathStep>) -> Self {
        self.attribute_path = path;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if !self.attribute_path.is_empty() {
            write!(f, " (at {})", format_path(&self.attribute_path))?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Translate a remote failure into addressed diagnostics.
///
/// Each item of a structured payload becomes one diagnostic whose summary is
/// the payload message. Anything else becomes a single unaddressed
/// diagnostic. The result is never empty.
pub fn translate(error: &RemoteError) -> Vec<Diagnostic> {
    let response = match error {
        RemoteError::Response(response) | RemoteError::ValidationFailed(Some(response)) => {
            response
        }
        _ => return vec![Diagnostic::error(error.to_string())],
    };

    if response.details.errors.is_empty() {
        return vec![Diagnostic::error(response.message.clone())];
    }

    response
        .details
        .errors
        .iter()
        .map(|item| Diagnostic {
            severity: Severity::Error,
            summary: response.message.clone(),
            detail: item.details.clone(),
            attribute_path: convert_path(item.path.as_ref()),
        })
        .collect()
}

/// Strings become attributes, numbers become indices (fractions are
/// truncated), everything else is dropped.
fn convert_path(path: Option<&Value>) -> Vec<PathStep> {
    let Some(Value::Array(elements)) = path else {
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|element| match element {
            Value::String(name) => Some(PathStep::attr(name.as_str())),
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
                .map(PathStep::index),
            _ => None,
        })
        .collect()
}
