//! Entry driver
//!
//! Writes are upsert, re-read, then lifecycle reconciliation against the
//! re-read snapshot. A failed re-read is reported with the upserted state
//! and no lifecycle call is made.

use super::{Driver, Failure, Outcome, ReadOutcome, default_environment, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use crate::lifecycle::{self, LifecycleState};
use cmakit::{Entry, EntryClient, EntryFields, EntryLifecycle, Environment, EnvironmentClient, Sys};
use log::info;
use serde::{Deserialize, Serialize};

/// One localized field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFieldSpec {
    pub id: String,
    pub content: String,
    pub locale: String,
}

/// Desired entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySpec {
    /// Fixed id; the remote assigns one when empty
    #[serde(default)]
    pub entry_id: String,
    pub space_id: String,
    #[serde(default = "default_environment")]
    pub env_id: String,
    #[serde(alias = "contenttype_id")]
    pub content_type_id: String,
    pub locale: String,
    #[serde(default, rename = "field")]
    pub fields: Vec<EntryFieldSpec>,
    pub published: bool,
    pub archived: bool,
}

impl EntrySpec {
    /// Field values keyed by field id then locale; later values win.
    pub fn entry_fields(&self) -> EntryFields {
        let mut fields = EntryFields::new();
        for field in &self.fields {
            fields
                .entry(field.id.clone())
                .or_default()
                .insert(field.locale.clone(), field.content.clone());
        }
        fields
    }
}

/// Entry attributes reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryState {
    pub id: String,
    pub version: u64,
    pub content_type_id: String,
    pub locale: String,
    pub fields: EntryFields,
    pub published: bool,
    pub archived: bool,
}

impl From<&Entry> for EntryState {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.sys.id.clone(),
            version: entry.sys.version,
            content_type_id: entry.content_type_id.clone(),
            locale: entry.locale.clone(),
            fields: entry.fields.clone(),
            published: entry.sys.is_published(),
            archived: entry.sys.is_archived(),
        }
    }
}

/// Reconciles entries within one environment
pub struct EntryDriver<'a> {
    environments: &'a dyn EnvironmentClient,
    entries: &'a dyn EntryClient,
}

impl<'a> EntryDriver<'a> {
    pub fn new(environments: &'a dyn EnvironmentClient, entries: &'a dyn EntryClient) -> Self {
        Self {
            environments,
            entries,
        }
    }

    fn environment(&self, ctx: &ReconcileContext, spec: &EntrySpec) -> Result<Environment, StepError> {
        ctx.call(&format!("environment.get {}", spec.env_id), || {
            self.environments.get(&spec.space_id, &spec.env_id)
        })
    }

    fn get(&self, ctx: &ReconcileContext, env: &Environment, id: &str) -> Result<Entry, StepError> {
        ctx.call(&format!("entry.get {id}"), || self.entries.get(env, id))
    }

    fn write(
        &self,
        ctx: &ReconcileContext,
        env: &Environment,
        draft: &Entry,
        spec: &EntrySpec,
    ) -> Outcome<EntryState> {
        let written = ctx.call("entry.upsert", || {
            self.entries.upsert(env, &spec.content_type_id, draft)
        })?;

        let current = self
            .get(ctx, env, &written.sys.id)
            .map_err(|err| Failure::from(err).with_last_known(EntryState::from(&written)))?;

        let ops = EntryLifecycle::new(self.entries, env);
        let desired = LifecycleState::new(spec.published, spec.archived);
        match lifecycle::reconcile(ctx, &ops, current, desired) {
            Ok(entry) => {
                info!("{} {} at version {}", self.kind(), entry.sys.id, entry.sys.version);
                Ok(EntryState::from(&entry))
            }
            Err(failure) => Err(Failure::from(failure.error)
                .with_last_known(EntryState::from(&failure.last_known))),
        }
    }
}

impl Driver for EntryDriver<'_> {
    type Spec = EntrySpec;
    type State = EntryState;

    fn kind(&self) -> &'static str {
        "entry"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &EntrySpec) -> Outcome<EntryState> {
        let env = self.environment(ctx, spec)?;
        let draft = Entry {
            sys: Sys::with_id(spec.entry_id.clone()),
            content_type_id: spec.content_type_id.clone(),
            locale: spec.locale.clone(),
            fields: spec.entry_fields(),
        };
        self.write(ctx, &env, &draft, spec)
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &EntrySpec,
    ) -> Result<ReadOutcome<EntryState>, Failure<EntryState>> {
        let env = self.environment(ctx, spec)?;
        gone_if_missing(self.get(ctx, &env, id).map(|entry| EntryState::from(&entry)))
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &EntrySpec) -> Outcome<EntryState> {
        let env = self.environment(ctx, spec)?;
        let mut draft = self.get(ctx, &env, id)?;
        draft.fields = spec.entry_fields();
        draft.locale = spec.locale.clone();
        self.write(ctx, &env, &draft, spec)
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &EntrySpec,
    ) -> Result<(), Failure<EntryState>> {
        let env = self.environment(ctx, spec)?;
        self.get(ctx, &env, id)?;
        ctx.call(&format!("entry.delete {id}"), || self.entries.delete(&env, id))?;
        Ok(())
    }
}
