//! Error types for remote API operations.
//!
//! The remote service answers failed calls with a generic error payload
//! whose `sys.id` names the error kind. Payloads are categorized so callers
//! can tell an absent object apart from a rejected write.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories of remote errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed object does not exist
    NotFound,
    /// The remote rejected the payload
    Validation,
    /// The write carried a stale version
    Conflict,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Object not found",
            Self::Validation => "Payload rejected by the remote",
            Self::Conflict => "Version conflict",
            Self::Other => "Unexpected error",
        }
    }
}

/// `sys` block of an error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSys {
    /// Error kind, e.g. "ValidationFailed", "NotFound", "VersionMismatch"
    #[serde(default)]
    pub id: String,
}

/// One item of an error payload.
///
/// `path` is untyped: the remote mixes attribute names and list indices
/// (and sometimes sends indices as floating point numbers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<serde_json::Value>,
}

/// Item list of an error payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

/// The generic error payload returned by the remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub sys: ErrorSys,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub details: ErrorDetails,
}

impl ErrorResponse {
    /// Create a payload of the given kind with no items.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sys: ErrorSys { id: kind.into() },
            message: message.into(),
            request_id: None,
            details: ErrorDetails::default(),
        }
    }

    /// Append an item addressed by `path`.
    pub fn with_error(
        mut self,
        details: impl Into<String>,
        path: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        self.details.errors.push(ErrorDetail {
            name: None,
            details: Some(details.into()),
            path: Some(serde_json::Value::Array(path.into_iter().collect())),
        });
        self
    }
}

/// Errors returned by remote API operations.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The addressed object does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of object that was looked up
        kind: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Generic error payload
    #[error("{}", .0.message)]
    Response(ErrorResponse),

    /// The remote rejected the payload; the detailed response may be missing
    #[error("{}", validation_message(.0))]
    ValidationFailed(Option<ErrorResponse>),

    /// Any other failure (transport, decoding, ...)
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Classify a decoded error payload by its `sys.id`.
    ///
    /// A `NotFound` payload stays a [`RemoteError::Response`] so its message
    /// is kept; [`RemoteError::category`] still reports it as not found.
    pub fn from_response(response: ErrorResponse) -> Self {
        match response.sys.id.as_str() {
            "ValidationFailed" => Self::ValidationFailed(Some(response)),
            _ => Self::Response(response),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ValidationFailed(_) => ErrorCategory::Validation,
            Self::Response(r) if r.sys.id == "NotFound" => ErrorCategory::NotFound,
            Self::Response(r) if r.sys.id == "VersionMismatch" => ErrorCategory::Conflict,
            Self::Response(r) if r.sys.id == "ValidationFailed" => ErrorCategory::Validation,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

fn validation_message(response: &Option<ErrorResponse>) -> &str {
    response
        .as_ref()
        .map_or("validation failed", |r| r.message.as_str())
}

/// Result type for remote API operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
