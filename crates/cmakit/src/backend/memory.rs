//! In-process backend that keeps remote state in memory.
//!
//! The backend enforces the consistency rules of the real service that
//! callers have to plan around:
//! - every write must carry the current version (`VersionMismatch` otherwise)
//! - a field's type cannot change in place
//! - a field can only be removed once its omission has been activated
//! - an object must be unpublished before it can be archived
//!
//! Every call is recorded, and failures can be queued per operation name
//! (e.g. `"entry.archive"`) to exercise partial-failure paths.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;

use super::{
    ApiKeyClient, AssetClient, ContentTypeClient, EntryClient, EnvironmentClient, LocaleClient,
    SpaceClient,
};
use crate::error::{ErrorResponse, RemoteError, Result};
use crate::types::{
    ApiKey, Asset, ContentType, Entry, Environment, Field, Locale, Space, Sys,
};

/// Name of the environment created with every space.
pub const DEFAULT_ENVIRONMENT: &str = "master";

#[derive(Debug, Clone, Copy)]
enum Change {
    Publish,
    Unpublish,
    Archive,
    Unarchive,
}

#[derive(Debug)]
struct ContentTypeRecord {
    content_type: ContentType,
    /// Field list of the last activation, `None` while inactive
    active: Option<Vec<Field>>,
}

#[derive(Debug, Default)]
struct EnvironmentRecord {
    environment: Environment,
    content_types: BTreeMap<String, ContentTypeRecord>,
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug, Default)]
struct SpaceRecord {
    space: Space,
    environments: BTreeMap<String, EnvironmentRecord>,
    assets: BTreeMap<String, Asset>,
    locales: BTreeMap<String, Locale>,
    api_keys: BTreeMap<String, ApiKey>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    spaces: BTreeMap<String, SpaceRecord>,
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<RemoteError>>,
}

impl State {
    /// Record a call and pop any failure queued for it.
    fn begin(&mut self, operation: &str) -> Result<()> {
        log::debug!("memory backend: {operation}");
        self.calls.push(operation.to_string());
        match self.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn space(&mut self, space_id: &str) -> Result<&mut SpaceRecord> {
        self.spaces
            .get_mut(space_id)
            .ok_or_else(|| RemoteError::not_found("Space", space_id))
    }

    fn environment(&mut self, env: &Environment) -> Result<&mut EnvironmentRecord> {
        self.space(&env.sys.space_id)?
            .environments
            .get_mut(&env.sys.id)
            .ok_or_else(|| RemoteError::not_found("Environment", &env.sys.id))
    }

    fn create_space(&mut self, id: String, name: &str, default_locale: &str) -> Space {
        let space = Space {
            sys: Sys {
                id: id.clone(),
                version: 1,
                space_id: id.clone(),
                ..Sys::default()
            },
            name: name.to_string(),
            default_locale: default_locale.to_string(),
        };
        let mut record = SpaceRecord {
            space: space.clone(),
            ..SpaceRecord::default()
        };
        record.environments.insert(
            DEFAULT_ENVIRONMENT.to_string(),
            EnvironmentRecord {
                environment: Environment {
                    sys: Sys {
                        id: DEFAULT_ENVIRONMENT.to_string(),
                        version: 1,
                        space_id: id.clone(),
                        ..Sys::default()
                    },
                    name: DEFAULT_ENVIRONMENT.to_string(),
                },
                ..EnvironmentRecord::default()
            },
        );
        self.spaces.insert(id, record);
        space
    }
}

/// A remote service held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a space with a fixed id and its default environment.
    pub fn seed_space(&self, space_id: &str, name: &str) -> Space {
        self.lock().create_space(space_id.to_string(), name, "en")
    }

    /// Queue a failure for the next call of `operation` (e.g. `"entry.publish"`).
    pub fn fail_next(&self, operation: &str, error: RemoteError) {
        self.lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Operations issued so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Field list of the last activation of a content type.
    pub fn active_fields(&self, env: &Environment, content_type_id: &str) -> Option<Vec<Field>> {
        let mut state = self.lock();
        state
            .environment(env)
            .ok()?
            .content_types
            .get(content_type_id)?
            .active
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ============================================================================
// Rule helpers
// ============================================================================

fn version_mismatch(kind: &str, stored: u64, given: u64) -> RemoteError {
    RemoteError::Response(ErrorResponse::new(
        "VersionMismatch",
        format!("{kind} version mismatch: current version is {stored}, got {given}"),
    ))
}

fn check_version(kind: &str, stored: &Sys, given: &Sys) -> Result<()> {
    if stored.version == given.version {
        Ok(())
    } else {
        Err(version_mismatch(kind, stored.version, given.version))
    }
}

fn bad_request(message: impl Into<String>) -> RemoteError {
    RemoteError::Response(ErrorResponse::new("BadRequest", message))
}

fn path<const N: usize>(steps: [Value; N]) -> Vec<Value> {
    steps.into_iter().collect()
}

/// Validate a new field list against the stored draft and the last activation.
fn check_field_changes(
    previous: &[Field],
    active: Option<&[Field]>,
    next: &[Field],
) -> Result<()> {
    let mut response = ErrorResponse::new("ValidationFailed", "Validation error");
    let mut seen = HashSet::new();

    for (index, field) in next.iter().enumerate() {
        if !seen.insert(field.id.as_str()) {
            response = response.with_error(
                format!("duplicate field id \"{}\"", field.id),
                path(["fields".into(), index.into(), "id".into()]),
            );
        }
        if let Some(prior) = previous.iter().find(|p| p.id == field.id)
            && prior.field_type != field.field_type
        {
            response = response.with_error(
                format!(
                    "field type of \"{}\" cannot change from {} to {}",
                    field.id, prior.field_type, field.field_type
                ),
                path(["fields".into(), index.into(), "type".into()]),
            );
        }
    }

    for (index, prior) in previous.iter().enumerate() {
        if next.iter().any(|f| f.id == prior.id) {
            continue;
        }
        let visible = active
            .and_then(|fields| fields.iter().find(|f| f.id == prior.id))
            .is_some_and(|f| !f.omitted);
        if visible {
            response = response.with_error(
                format!(
                    "field \"{}\" must be omitted and activated before it can be deleted",
                    prior.id
                ),
                path(["fields".into(), index.into()]),
            );
        }
    }

    if response.details.errors.is_empty() {
        Ok(())
    } else {
        Err(RemoteError::ValidationFailed(Some(response)))
    }
}

/// Validate entry field ids against the active field list of its content type.
fn check_entry_fields(active: &[Field], entry: &Entry) -> Result<()> {
    let mut response = ErrorResponse::new("ValidationFailed", "Validation error");
    for id in entry.fields.keys() {
        if !active.iter().any(|f| &f.id == id && !f.omitted) {
            response = response.with_error(
                format!("No field with id \"{id}\" found"),
                path(["fields".into(), id.as_str().into()]),
            );
        }
    }
    if response.details.errors.is_empty() {
        Ok(())
    } else {
        Err(RemoteError::ValidationFailed(Some(response)))
    }
}

fn apply_change(kind: &str, stored: &mut Sys, given: &Sys, change: Change) -> Result<()> {
    check_version(kind, stored, given)?;
    match change {
        Change::Publish => {
            if stored.is_archived() {
                return Err(bad_request(format!("cannot publish an archived {kind}")));
            }
            stored.published_at = Some(Utc::now());
        }
        Change::Unpublish => {
            if !stored.is_published() {
                return Err(bad_request(format!("{kind} is not published")));
            }
            stored.published_at = None;
        }
        Change::Archive => {
            if stored.is_published() {
                return Err(bad_request(format!("cannot archive a published {kind}")));
            }
            if stored.is_archived() {
                return Err(bad_request(format!("{kind} is already archived")));
            }
            stored.archived_at = Some(Utc::now());
        }
        Change::Unarchive => {
            if !stored.is_archived() {
                return Err(bad_request(format!("{kind} is not archived")));
            }
            stored.archived_at = None;
        }
    }
    stored.version += 1;
    Ok(())
}

// ============================================================================
// Content types
// ============================================================================

impl ContentTypeClient for MemoryBackend {
    fn get(&self, env: &Environment, content_type_id: &str) -> Result<ContentType> {
        let mut state = self.lock();
        state.begin("content_type.get")?;
        state
            .environment(env)?
            .content_types
            .get(content_type_id)
            .map(|r| r.content_type.clone())
            .ok_or_else(|| RemoteError::not_found("ContentType", content_type_id))
    }

    fn upsert(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType> {
        let mut state = self.lock();
        state.begin("content_type.upsert")?;
        let id = if content_type.sys.id.is_empty() {
            state.generate_id("ct")
        } else {
            content_type.sys.id.clone()
        };
        let record = state.environment(env)?;

        match record.content_types.get_mut(&id) {
            Some(existing) => {
                check_version("ContentType", &existing.content_type.sys, &content_type.sys)?;
                check_field_changes(
                    &existing.content_type.fields,
                    existing.active.as_deref(),
                    &content_type.fields,
                )?;
                let sys = existing.content_type.sys.clone();
                existing.content_type = ContentType {
                    sys: Sys {
                        version: sys.version + 1,
                        ..sys
                    },
                    ..content_type.clone()
                };
                Ok(existing.content_type.clone())
            }
            None => {
                if content_type.sys.version != 0 {
                    return Err(RemoteError::not_found("ContentType", id));
                }
                check_field_changes(&[], None, &content_type.fields)?;
                let created = ContentType {
                    sys: Sys {
                        id: id.clone(),
                        version: 1,
                        space_id: env.sys.space_id.clone(),
                        ..Sys::default()
                    },
                    ..content_type.clone()
                };
                record.content_types.insert(
                    id,
                    ContentTypeRecord {
                        content_type: created.clone(),
                        active: None,
                    },
                );
                Ok(created)
            }
        }
    }

    fn activate(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType> {
        let mut state = self.lock();
        state.begin("content_type.activate")?;
        let record = state
            .environment(env)?
            .content_types
            .get_mut(&content_type.sys.id)
            .ok_or_else(|| RemoteError::not_found("ContentType", &content_type.sys.id))?;
        check_version("ContentType", &record.content_type.sys, &content_type.sys)?;

        record.active = Some(record.content_type.fields.clone());
        record.content_type.sys.published_at = Some(Utc::now());
        record.content_type.sys.version += 1;
        Ok(record.content_type.clone())
    }

    fn deactivate(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType> {
        let mut state = self.lock();
        state.begin("content_type.deactivate")?;
        let record = state
            .environment(env)?
            .content_types
            .get_mut(&content_type.sys.id)
            .ok_or_else(|| RemoteError::not_found("ContentType", &content_type.sys.id))?;
        check_version("ContentType", &record.content_type.sys, &content_type.sys)?;
        if record.active.is_none() {
            return Err(bad_request("content type is not active"));
        }

        record.active = None;
        record.content_type.sys.published_at = None;
        record.content_type.sys.version += 1;
        Ok(record.content_type.clone())
    }

    fn delete(&self, env: &Environment, content_type: &ContentType) -> Result<()> {
        let mut state = self.lock();
        state.begin("content_type.delete")?;
        let record = state.environment(env)?;
        let existing = record
            .content_types
            .get(&content_type.sys.id)
            .ok_or_else(|| RemoteError::not_found("ContentType", &content_type.sys.id))?;
        if existing.active.is_some() {
            return Err(bad_request("cannot delete an active content type"));
        }
        record.content_types.remove(&content_type.sys.id);
        Ok(())
    }
}

// ============================================================================
// Entries
// ============================================================================

impl MemoryBackend {
    fn change_entry(
        &self,
        operation: &str,
        env: &Environment,
        entry: &Entry,
        change: Change,
    ) -> Result<Entry> {
        let mut state = self.lock();
        state.begin(operation)?;
        let stored = state
            .environment(env)?
            .entries
            .get_mut(&entry.sys.id)
            .ok_or_else(|| RemoteError::not_found("Entry", &entry.sys.id))?;
        apply_change("entry", &mut stored.sys, &entry.sys, change)?;
        Ok(stored.clone())
    }
}

impl EntryClient for MemoryBackend {
    fn get(&self, env: &Environment, entry_id: &str) -> Result<Entry> {
        let mut state = self.lock();
        state.begin("entry.get")?;
        state
            .environment(env)?
            .entries
            .get(entry_id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Entry", entry_id))
    }

    fn upsert(&self, env: &Environment, content_type_id: &str, entry: &Entry) -> Result<Entry> {
        let mut state = self.lock();
        state.begin("entry.upsert")?;
        let id = if entry.sys.id.is_empty() {
            state.generate_id("entry")
        } else {
            entry.sys.id.clone()
        };
        let record = state.environment(env)?;

        let active = record
            .content_types
            .get(content_type_id)
            .ok_or_else(|| RemoteError::not_found("ContentType", content_type_id))?
            .active
            .clone()
            .ok_or_else(|| bad_request(format!("content type {content_type_id} is not active")))?;
        check_entry_fields(&active, entry)?;

        match record.entries.get_mut(&id) {
            Some(existing) => {
                check_version("Entry", &existing.sys, &entry.sys)?;
                if existing.sys.is_archived() {
                    return Err(bad_request("cannot update an archived entry"));
                }
                existing.fields = entry.fields.clone();
                existing.locale = entry.locale.clone();
                existing.content_type_id = content_type_id.to_string();
                existing.sys.version += 1;
                Ok(existing.clone())
            }
            None => {
                if entry.sys.version != 0 {
                    return Err(RemoteError::not_found("Entry", id));
                }
                let created = Entry {
                    sys: Sys {
                        id: id.clone(),
                        version: 1,
                        space_id: env.sys.space_id.clone(),
                        ..Sys::default()
                    },
                    content_type_id: content_type_id.to_string(),
                    ..entry.clone()
                };
                record.entries.insert(id, created.clone());
                Ok(created)
            }
        }
    }

    fn delete(&self, env: &Environment, entry_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.begin("entry.delete")?;
        state
            .environment(env)?
            .entries
            .remove(entry_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("Entry", entry_id))
    }

    fn publish(&self, env: &Environment, entry: &Entry) -> Result<Entry> {
        self.change_entry("entry.publish", env, entry, Change::Publish)
    }

    fn unpublish(&self, env: &Environment, entry: &Entry) -> Result<Entry> {
        self.change_entry("entry.unpublish", env, entry, Change::Unpublish)
    }

    fn archive(&self, env: &Environment, entry: &Entry) -> Result<Entry> {
        self.change_entry("entry.archive", env, entry, Change::Archive)
    }

    fn unarchive(&self, env: &Environment, entry: &Entry) -> Result<Entry> {
        self.change_entry("entry.unarchive", env, entry, Change::Unarchive)
    }
}

// ============================================================================
// Assets
// ============================================================================

impl MemoryBackend {
    fn change_asset(
        &self,
        operation: &str,
        space_id: &str,
        asset: &Asset,
        change: Change,
    ) -> Result<Asset> {
        let mut state = self.lock();
        state.begin(operation)?;
        let stored = state
            .space(space_id)?
            .assets
            .get_mut(&asset.sys.id)
            .ok_or_else(|| RemoteError::not_found("Asset", &asset.sys.id))?;
        apply_change("asset", &mut stored.sys, &asset.sys, change)?;
        Ok(stored.clone())
    }
}

impl AssetClient for MemoryBackend {
    fn get(&self, space_id: &str, asset_id: &str) -> Result<Asset> {
        let mut state = self.lock();
        state.begin("asset.get")?;
        state
            .space(space_id)?
            .assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Asset", asset_id))
    }

    fn upsert(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        let mut state = self.lock();
        state.begin("asset.upsert")?;
        let id = if asset.sys.id.is_empty() {
            state.generate_id("asset")
        } else {
            asset.sys.id.clone()
        };
        let record = state.space(space_id)?;

        match record.assets.get_mut(&id) {
            Some(existing) => {
                check_version("Asset", &existing.sys, &asset.sys)?;
                if existing.sys.is_archived() {
                    return Err(bad_request("cannot update an archived asset"));
                }
                existing.fields = asset.fields.clone();
                existing.locale = asset.locale.clone();
                existing.sys.version += 1;
                Ok(existing.clone())
            }
            None => {
                if asset.sys.version != 0 {
                    return Err(RemoteError::not_found("Asset", id));
                }
                let created = Asset {
                    sys: Sys {
                        id: id.clone(),
                        version: 1,
                        space_id: space_id.to_string(),
                        ..Sys::default()
                    },
                    ..asset.clone()
                };
                record.assets.insert(id, created.clone());
                Ok(created)
            }
        }
    }

    fn process(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        let mut state = self.lock();
        state.begin("asset.process")?;
        let stored = state
            .space(space_id)?
            .assets
            .get_mut(&asset.sys.id)
            .ok_or_else(|| RemoteError::not_found("Asset", &asset.sys.id))?;
        check_version("Asset", &stored.sys, &asset.sys)?;

        let mut response = ErrorResponse::new("ValidationFailed", "Validation error");
        for (locale, file) in &mut stored.fields.file {
            if file.url.is_some() {
                continue;
            }
            match &file.upload_url {
                Some(_) => {
                    file.url = Some(format!(
                        "//assets.local/{space_id}/{}/{}",
                        stored.sys.id, file.file_name
                    ));
                }
                None => {
                    response = response.with_error(
                        "file has neither a url nor an upload url",
                        path([
                            "fields".into(),
                            "file".into(),
                            locale.as_str().into(),
                            "upload".into(),
                        ]),
                    );
                }
            }
        }
        if !response.details.errors.is_empty() {
            return Err(RemoteError::ValidationFailed(Some(response)));
        }

        stored.sys.version += 1;
        Ok(stored.clone())
    }

    fn delete(&self, space_id: &str, asset: &Asset) -> Result<()> {
        let mut state = self.lock();
        state.begin("asset.delete")?;
        state
            .space(space_id)?
            .assets
            .remove(&asset.sys.id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("Asset", &asset.sys.id))
    }

    fn publish(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        self.change_asset("asset.publish", space_id, asset, Change::Publish)
    }

    fn unpublish(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        self.change_asset("asset.unpublish", space_id, asset, Change::Unpublish)
    }

    fn archive(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        self.change_asset("asset.archive", space_id, asset, Change::Archive)
    }

    fn unarchive(&self, space_id: &str, asset: &Asset) -> Result<Asset> {
        self.change_asset("asset.unarchive", space_id, asset, Change::Unarchive)
    }
}

// ============================================================================
// Environments, spaces, locales, API keys
// ============================================================================

impl EnvironmentClient for MemoryBackend {
    fn get(&self, space_id: &str, environment_id: &str) -> Result<Environment> {
        let mut state = self.lock();
        state.begin("environment.get")?;
        state
            .space(space_id)?
            .environments
            .get(environment_id)
            .map(|r| r.environment.clone())
            .ok_or_else(|| RemoteError::not_found("Environment", environment_id))
    }

    fn upsert(&self, space_id: &str, environment: &Environment) -> Result<Environment> {
        let mut state = self.lock();
        state.begin("environment.upsert")?;
        let id = if environment.sys.id.is_empty() {
            environment.name.clone()
        } else {
            environment.sys.id.clone()
        };
        let record = state.space(space_id)?;

        match record.environments.get_mut(&id) {
            Some(existing) => {
                check_version("Environment", &existing.environment.sys, &environment.sys)?;
                existing.environment.name = environment.name.clone();
                existing.environment.sys.version += 1;
                Ok(existing.environment.clone())
            }
            None => {
                let created = Environment {
                    sys: Sys {
                        id: id.clone(),
                        version: 1,
                        space_id: space_id.to_string(),
                        ..Sys::default()
                    },
                    name: environment.name.clone(),
                };
                record.environments.insert(
                    id,
                    EnvironmentRecord {
                        environment: created.clone(),
                        ..EnvironmentRecord::default()
                    },
                );
                Ok(created)
            }
        }
    }

    fn delete(&self, space_id: &str, environment: &Environment) -> Result<()> {
        let mut state = self.lock();
        state.begin("environment.delete")?;
        state
            .space(space_id)?
            .environments
            .remove(&environment.sys.id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("Environment", &environment.sys.id))
    }
}

impl SpaceClient for MemoryBackend {
    fn get(&self, space_id: &str) -> Result<Space> {
        let mut state = self.lock();
        state.begin("space.get")?;
        state.space(space_id).map(|r| r.space.clone())
    }

    fn upsert(&self, space: &Space) -> Result<Space> {
        let mut state = self.lock();
        state.begin("space.upsert")?;
        if let Some(existing) = state.spaces.get_mut(&space.sys.id) {
            check_version("Space", &existing.space.sys, &space.sys)?;
            existing.space.name = space.name.clone();
            existing.space.sys.version += 1;
            return Ok(existing.space.clone());
        }
        let id = if space.sys.id.is_empty() {
            state.generate_id("space")
        } else {
            space.sys.id.clone()
        };
        Ok(state.create_space(id, &space.name, &space.default_locale))
    }

    fn delete(&self, space: &Space) -> Result<()> {
        let mut state = self.lock();
        state.begin("space.delete")?;
        state
            .spaces
            .remove(&space.sys.id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("Space", &space.sys.id))
    }
}

impl LocaleClient for MemoryBackend {
    fn get(&self, space_id: &str, locale_id: &str) -> Result<Locale> {
        let mut state = self.lock();
        state.begin("locale.get")?;
        state
            .space(space_id)?
            .locales
            .get(locale_id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Locale", locale_id))
    }

    fn upsert(&self, space_id: &str, locale: &Locale) -> Result<Locale> {
        let mut state = self.lock();
        state.begin("locale.upsert")?;
        let generated = state.generate_id("locale");
        let record = state.space(space_id)?;

        if let Some(existing) = record.locales.get_mut(&locale.sys.id) {
            check_version("Locale", &existing.sys, &locale.sys)?;
            let sys = Sys {
                version: existing.sys.version + 1,
                ..existing.sys.clone()
            };
            *existing = Locale {
                sys,
                ..locale.clone()
            };
            return Ok(existing.clone());
        }

        if record.locales.values().any(|l| l.code == locale.code) {
            return Err(RemoteError::ValidationFailed(Some(
                ErrorResponse::new("ValidationFailed", "Validation error").with_error(
                    format!("locale code \"{}\" is already in use", locale.code),
                    path(["code".into()]),
                ),
            )));
        }
        let id = if locale.sys.id.is_empty() {
            generated
        } else {
            locale.sys.id.clone()
        };
        let created = Locale {
            sys: Sys {
                id: id.clone(),
                version: 1,
                space_id: space_id.to_string(),
                ..Sys::default()
            },
            ..locale.clone()
        };
        record.locales.insert(id, created.clone());
        Ok(created)
    }

    fn delete(&self, space_id: &str, locale: &Locale) -> Result<()> {
        let mut state = self.lock();
        state.begin("locale.delete")?;
        state
            .space(space_id)?
            .locales
            .remove(&locale.sys.id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("Locale", &locale.sys.id))
    }
}

impl ApiKeyClient for MemoryBackend {
    fn get(&self, space_id: &str, api_key_id: &str) -> Result<ApiKey> {
        let mut state = self.lock();
        state.begin("api_key.get")?;
        state
            .space(space_id)?
            .api_keys
            .get(api_key_id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("ApiKey", api_key_id))
    }

    fn upsert(&self, space_id: &str, api_key: &ApiKey) -> Result<ApiKey> {
        let mut state = self.lock();
        state.begin("api_key.upsert")?;
        let generated = state.generate_id("key");
        let record = state.space(space_id)?;

        if let Some(existing) = record.api_keys.get_mut(&api_key.sys.id) {
            check_version("ApiKey", &existing.sys, &api_key.sys)?;
            existing.name = api_key.name.clone();
            existing.description = api_key.description.clone();
            existing.sys.version += 1;
            return Ok(existing.clone());
        }

        let id = if api_key.sys.id.is_empty() {
            generated
        } else {
            api_key.sys.id.clone()
        };
        let created = ApiKey {
            sys: Sys {
                id: id.clone(),
                version: 1,
                space_id: space_id.to_string(),
                ..Sys::default()
            },
            name: api_key.name.clone(),
            description: api_key.description.clone(),
            access_token: format!("token-{id}"),
        };
        record.api_keys.insert(id, created.clone());
        Ok(created)
    }

    fn delete(&self, space_id: &str, api_key: &ApiKey) -> Result<()> {
        let mut state = self.lock();
        state.begin("api_key.delete")?;
        state
            .space(space_id)?
            .api_keys
            .remove(&api_key.sys.id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("ApiKey", &api_key.sys.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn setup() -> (MemoryBackend, Environment) {
        let backend = MemoryBackend::new();
        backend.seed_space("space1", "Test");
        let env = EnvironmentClient::get(&backend, "space1", DEFAULT_ENVIRONMENT).unwrap();
        (backend, env)
    }

    fn content_type(fields: Vec<Field>) -> ContentType {
        ContentType {
            sys: Sys::with_id("post"),
            name: "Post".to_string(),
            description: None,
            display_field: "title".to_string(),
            fields,
        }
    }

    #[test]
    fn test_upsert_rejects_stale_version() {
        let (backend, env) = setup();
        let created = ContentTypeClient::upsert(
            &backend,
            &env,
            &content_type(vec![Field::new("title", "Title", "Symbol")]),
        )
        .unwrap();
        assert_eq!(created.sys.version, 1);

        let updated = ContentTypeClient::upsert(&backend, &env, &created).unwrap();
        assert_eq!(updated.sys.version, 2);

        let err = ContentTypeClient::upsert(&backend, &env, &created).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_field_type_cannot_change_in_place() {
        let (backend, env) = setup();
        let created = ContentTypeClient::upsert(
            &backend,
            &env,
            &content_type(vec![Field::new("title", "Title", "Symbol")]),
        )
        .unwrap();

        let mut retyped = created.clone();
        retyped.fields[0].field_type = "Text".to_string();
        let err = ContentTypeClient::upsert(&backend, &env, &retyped).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_field_removal_requires_activated_omission() {
        let (backend, env) = setup();
        let created = ContentTypeClient::upsert(
            &backend,
            &env,
            &content_type(vec![
                Field::new("title", "Title", "Symbol"),
                Field::new("body", "Body", "Text"),
            ]),
        )
        .unwrap();
        let active = backend.activate(&env, &created).unwrap();

        let mut removed = active.clone();
        removed.fields.truncate(1);
        let err = ContentTypeClient::upsert(&backend, &env, &removed).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);

        let mut omitted = active;
        omitted.fields[1].omitted = true;
        let omitted = ContentTypeClient::upsert(&backend, &env, &omitted).unwrap();
        let omitted = backend.activate(&env, &omitted).unwrap();

        let mut removed = omitted;
        removed.fields.truncate(1);
        assert!(ContentTypeClient::upsert(&backend, &env, &removed).is_ok());
    }

    #[test]
    fn test_archive_requires_unpublished() {
        let (backend, env) = setup();
        let ct = ContentTypeClient::upsert(
            &backend,
            &env,
            &content_type(vec![Field::new("title", "Title", "Symbol")]),
        )
        .unwrap();
        backend.activate(&env, &ct).unwrap();

        let entry = EntryClient::upsert(&backend, &env, "post", &Entry::default()).unwrap();
        let published = EntryClient::publish(&backend, &env, &entry).unwrap();
        assert!(EntryClient::archive(&backend, &env, &published).is_err());

        let unpublished = EntryClient::unpublish(&backend, &env, &published).unwrap();
        let archived = EntryClient::archive(&backend, &env, &unpublished).unwrap();
        assert!(archived.sys.is_archived());
        assert_eq!(archived.sys.version, 4);
    }

    #[test]
    fn test_queued_failure_is_returned_once() {
        let (backend, _env) = setup();
        backend.fail_next("space.get", RemoteError::Other("boom".to_string()));

        assert!(SpaceClient::get(&backend, "space1").is_err());
        assert!(SpaceClient::get(&backend, "space1").is_ok());
        assert_eq!(
            backend.calls(),
            vec!["environment.get", "space.get", "space.get"]
        );
    }
}
