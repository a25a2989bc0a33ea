//! Core types for the remote content management API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// System metadata the remote service attaches to every object.
///
/// `version` is assigned by the remote and advanced by every successful
/// write. A write carrying a stale version is rejected as a conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    /// Object identifier (empty until the remote assigns one)
    #[serde(default)]
    pub id: String,
    /// Remote version counter
    #[serde(default)]
    pub version: u64,
    /// Owning space
    #[serde(default)]
    pub space_id: String,
    /// Set while the object is published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Set while the object is archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Sys {
    /// Metadata for an object the caller wants created under a fixed id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Whether the object is in the published lifecycle state.
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Whether the object is in the archived lifecycle state.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A versioned, publishable and archivable remote object (entries and assets).
pub trait Versioned {
    /// System metadata of the object.
    fn sys(&self) -> &Sys;

    /// Object identifier.
    fn id(&self) -> &str {
        &self.sys().id
    }

    /// Current remote version.
    fn version(&self) -> u64 {
        self.sys().version
    }

    /// Whether `published_at` is set.
    fn is_published(&self) -> bool {
        self.sys().is_published()
    }

    /// Whether `archived_at` is set.
    fn is_archived(&self) -> bool {
        self.sys().is_archived()
    }
}

// ============================================================================
// Content types
// ============================================================================

/// An opaque validation rule attached to a field.
///
/// The remote API accepts a JSON object per rule; its keys are not
/// interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Validation(pub serde_json::Map<String, serde_json::Value>);

impl Validation {
    /// Parse a rule from its JSON text. Anything other than a JSON object is rejected.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Element type of an array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayItem {
    /// Element type (e.g. "Symbol", "Link")
    #[serde(rename = "type")]
    pub item_type: String,
    /// Linked object type when `item_type` is "Link"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    /// Validation rules for each element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
}

/// A field of a content type.
///
/// `omitted` and `disabled` are schema flags, not deletions: an omitted
/// field is still part of the type but hidden from content delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field identifier, unique within its content type
    pub id: String,
    /// Display name
    pub name: String,
    /// Field type (e.g. "Symbol", "Text", "Integer", "Array")
    #[serde(rename = "type")]
    pub field_type: String,
    /// Linked object type when `field_type` is "Link"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    /// Element description when `field_type` is "Array"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ArrayItem>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub omitted: bool,
    /// Validation rules, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
}

impl Field {
    /// Create a field with all flags cleared.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
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

/// A versioned schema definition owned by an environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    pub sys: Sys,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display_field: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ContentType {
    /// Find a field by id.
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

// ============================================================================
// Entries and assets
// ============================================================================

/// Localized field values, keyed by field id then locale code.
pub type EntryFields = BTreeMap<String, BTreeMap<String, String>>;

/// A structured content record conforming to a content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub sys: Sys,
    /// Content type the entry conforms to
    #[serde(default)]
    pub content_type_id: String,
    /// Default locale used when writing the entry
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub fields: EntryFields,
}

impl Versioned for Entry {
    fn sys(&self) -> &Sys {
        &self.sys
    }
}

/// Image dimensions of a processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub width: u32,
    pub height: u32,
}

/// Size and image metadata of a processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDetails>,
}

/// The binary payload of an asset for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Delivery URL, set once the file is processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source URL the remote fetches the file from during processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    pub file_name: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FileDetails>,
}

/// Localized asset metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFields {
    #[serde(default)]
    pub title: BTreeMap<String, String>,
    #[serde(default)]
    pub description: BTreeMap<String, String>,
    #[serde(default)]
    pub file: BTreeMap<String, File>,
}

/// A managed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub sys: Sys,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub fields: AssetFields,
}

impl Versioned for Asset {
    fn sys(&self) -> &Sys {
        &self.sys
    }
}

// ============================================================================
// Organizational objects
// ============================================================================

/// An environment within a space. Its id is its name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub sys: Sys,
    pub name: String,
}

/// A space: the top-level scope holding environments, locales and keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub sys: Sys,
    pub name: String,
    pub default_locale: String,
}

/// A locale configured on a space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub sys: Sys,
    pub name: String,
    pub code: String,
    pub fallback_code: String,
    pub optional: bool,
    /// Available through the delivery API
    pub cda: bool,
    /// Available through the management API
    pub cma: bool,
}

/// A delivery API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub sys: Sys,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Assigned by the remote on creation
    #[serde(default)]
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_deserializes_with_defaults() {
        let field: Field =
            serde_json::from_str(r#"{"id": "title", "name": "Title", "type": "Symbol"}"#)
                .unwrap();
        assert_eq!(field, Field::new("title", "Title", "Symbol"));
    }

    #[test]
    fn test_validation_rejects_non_object() {
        assert!(Validation::from_json(r#"{"size": {"max": 10}}"#).is_ok());
        assert!(Validation::from_json(r#""unique""#).is_err());
        assert!(Validation::from_json("not json").is_err());
    }

    #[test]
    fn test_lifecycle_flags_follow_timestamps() {
        let mut entry = Entry::default();
        assert!(!entry.is_published());
        assert!(!entry.is_archived());

        entry.sys.published_at = Some(Utc::now());
        assert!(entry.is_published());
        assert!(!entry.is_archived());
    }
}
