//! Asset driver
//!
//! Writes are upsert, process, re-read, then lifecycle reconciliation. The
//! file is declared for the asset's own locale only.

use super::{Driver, Failure, Outcome, ReadOutcome, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use crate::lifecycle::{self, LifecycleState};
use cmakit::{Asset, AssetClient, AssetFields, AssetLifecycle, File, FileDetails, Sys};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text for one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub locale: String,
    pub content: String,
}

/// Declared file of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Delivery URL of an already processed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source URL the remote fetches when processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<String>,
    pub file_name: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FileDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFieldsSpec {
    #[serde(default)]
    pub title: Vec<LocalizedText>,
    #[serde(default)]
    pub description: Vec<LocalizedText>,
    pub file: FileSpec,
}

/// Desired asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Fixed id; the remote assigns one when empty
    #[serde(default)]
    pub asset_id: String,
    pub space_id: String,
    pub locale: String,
    pub fields: AssetFieldsSpec,
    pub published: bool,
    pub archived: bool,
}

impl AssetSpec {
    pub fn asset_fields(&self) -> AssetFields {
        let localized = |texts: &[LocalizedText]| {
            texts
                .iter()
                .map(|t| (t.locale.clone(), t.content.clone()))
                .collect::<BTreeMap<_, _>>()
        };
        let file = &self.fields.file;

        AssetFields {
            title: localized(&self.fields.title),
            description: localized(&self.fields.description),
            file: BTreeMap::from([(
                self.locale.clone(),
                File {
                    url: file.url.clone(),
                    upload_url: file.upload.clone(),
                    file_name: file.file_name.clone(),
                    content_type: file.content_type.clone(),
                    details: file.details.clone(),
                },
            )]),
        }
    }
}

/// Asset attributes reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    pub id: String,
    pub version: u64,
    pub space_id: String,
    pub locale: String,
    pub title: BTreeMap<String, String>,
    pub description: BTreeMap<String, String>,
    /// Delivery URL of the file in the asset's locale, once processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published: bool,
    pub archived: bool,
}

impl From<&Asset> for AssetState {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.sys.id.clone(),
            version: asset.sys.version,
            space_id: asset.sys.space_id.clone(),
            locale: asset.locale.clone(),
            title: asset.fields.title.clone(),
            description: asset.fields.description.clone(),
            url: asset
                .fields
                .file
                .get(&asset.locale)
                .and_then(|file| file.url.clone()),
            published: asset.sys.is_published(),
            archived: asset.sys.is_archived(),
        }
    }
}

/// Reconciles assets within one space
pub struct AssetDriver<'a> {
    assets: &'a dyn AssetClient,
}

impl<'a> AssetDriver<'a> {
    pub fn new(assets: &'a dyn AssetClient) -> Self {
        Self { assets }
    }

    fn get(&self, ctx: &ReconcileContext, space_id: &str, id: &str) -> Result<Asset, StepError> {
        ctx.call(&format!("asset.get {id}"), || self.assets.get(space_id, id))
    }

    fn write(&self, ctx: &ReconcileContext, draft: &Asset, spec: &AssetSpec) -> Outcome<AssetState> {
        let space_id = spec.space_id.as_str();
        let written = ctx.call("asset.upsert", || self.assets.upsert(space_id, draft))?;
        let processed = ctx
            .call(&format!("asset.process {}", written.sys.id), || {
                self.assets.process(space_id, &written)
            })
            .map_err(|err| Failure::from(err).with_last_known(AssetState::from(&written)))?;

        let current = self
            .get(ctx, space_id, &processed.sys.id)
            .map_err(|err| Failure::from(err).with_last_known(AssetState::from(&processed)))?;

        let ops = AssetLifecycle::new(self.assets, space_id);
        let desired = LifecycleState::new(spec.published, spec.archived);
        match lifecycle::reconcile(ctx, &ops, current, desired) {
            Ok(asset) => {
                info!("{} {} at version {}", self.kind(), asset.sys.id, asset.sys.version);
                Ok(AssetState::from(&asset))
            }
            Err(failure) => Err(Failure::from(failure.error)
                .with_last_known(AssetState::from(&failure.last_known))),
        }
    }
}

impl Driver for AssetDriver<'_> {
    type Spec = AssetSpec;
    type State = AssetState;

    fn kind(&self) -> &'static str {
        "asset"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &AssetSpec) -> Outcome<AssetState> {
        let draft = Asset {
            sys: Sys::with_id(spec.asset_id.clone()),
            locale: spec.locale.clone(),
            fields: spec.asset_fields(),
        };
        self.write(ctx, &draft, spec)
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &AssetSpec,
    ) -> Result<ReadOutcome<AssetState>, Failure<AssetState>> {
        gone_if_missing(
            self.get(ctx, &spec.space_id, id)
                .map(|asset| AssetState::from(&asset)),
        )
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &AssetSpec) -> Outcome<AssetState> {
        let mut draft = self.get(ctx, &spec.space_id, id)?;
        draft.locale = spec.locale.clone();
        draft.fields = spec.asset_fields();
        self.write(ctx, &draft, spec)
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &AssetSpec,
    ) -> Result<(), Failure<AssetState>> {
        let asset = self.get(ctx, &spec.space_id, id)?;
        ctx.call(&format!("asset.delete {id}"), || {
            self.assets.delete(&spec.space_id, &asset)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmakit::{MemoryBackend, RemoteError};

    fn spec(published: bool, archived: bool) -> AssetSpec {
        AssetSpec {
            asset_id: "logo".to_string(),
            space_id: "space1".to_string(),
            locale: "en-US".to_string(),
            fields: AssetFieldsSpec {
                title: vec![LocalizedText {
                    locale: "en-US".to_string(),
                    content: "Logo".to_string(),
                }],
                description: Vec::new(),
                file: FileSpec {
                    url: None,
                    upload: Some("https://example.com/logo.png".to_string()),
                    file_name: "logo.png".to_string(),
                    content_type: "image/png".to_string(),
                    details: None,
                },
            },
            published,
            archived,
        }
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed_space("space1", "Test");
        backend
    }

    #[test]
    fn test_create_processes_then_publishes() {
        let backend = backend();
        let driver = AssetDriver::new(&backend);
        let ctx = ReconcileContext::new();

        let state = driver.create(&ctx, &spec(true, false)).unwrap();

        assert!(state.published);
        assert!(state.url.is_some());
        assert_eq!(state.version, 3);
        assert_eq!(
            backend.calls(),
            vec!["asset.upsert", "asset.process", "asset.get", "asset.publish"]
        );
    }

    #[test]
    fn test_failed_reread_skips_lifecycle() {
        let backend = backend();
        let driver = AssetDriver::new(&backend);
        let ctx = ReconcileContext::new();
        backend.fail_next("asset.get", RemoteError::Other("read timed out".to_string()));

        let failure = driver.create(&ctx, &spec(true, false)).unwrap_err();

        assert_eq!(failure.diagnostics[0].summary, "read timed out");
        let last_known = failure.last_known.unwrap();
        assert_eq!(last_known.version, 2);
        assert!(!last_known.published);
        assert!(!backend.calls().contains(&"asset.publish".to_string()));
    }

    #[test]
    fn test_missing_upload_is_reported_by_process() {
        let backend = backend();
        let driver = AssetDriver::new(&backend);
        let ctx = ReconcileContext::new();
        let mut spec = spec(false, false);
        spec.fields.file.upload = None;

        let failure = driver.create(&ctx, &spec).unwrap_err();

        assert_eq!(
            crate::diagnostic::format_path(&failure.diagnostics[0].attribute_path),
            "fields.file.en-US.upload"
        );
        assert_eq!(failure.last_known.unwrap().version, 1);
    }
}
