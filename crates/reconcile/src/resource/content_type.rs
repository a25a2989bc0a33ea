//! Content type driver
//!
//! Every write is an upsert followed by an activation. Updates migrate the
//! live field list through the omission passes from [`crate::fields`] and
//! always finish with the literal desired list.

use super::{Driver, Failure, Outcome, ReadOutcome, default_environment, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use crate::fields::{FieldSpec, schedule};
use crate::validation::build_fields;
use cmakit::{ContentType, ContentTypeClient, Environment, EnvironmentClient, Field, Sys};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Desired content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeSpec {
    pub space_id: String,
    #[serde(default = "default_environment")]
    pub env_id: String,
    /// Fixed id; the remote assigns one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type_id: Option<String>,
    pub name: String,
    /// Left untouched on update when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display_field: String,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSpec>,
}

/// Content type attributes reported to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeState {
    pub id: String,
    pub version: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display_field: String,
    pub fields: Vec<Field>,
}

impl From<&ContentType> for ContentTypeState {
    fn from(ct: &ContentType) -> Self {
        Self {
            id: ct.sys.id.clone(),
            version: ct.sys.version,
            name: ct.name.clone(),
            description: ct.description.clone(),
            display_field: ct.display_field.clone(),
            fields: ct.fields.clone(),
        }
    }
}

/// Reconciles content types within one environment
pub struct ContentTypeDriver<'a> {
    environments: &'a dyn EnvironmentClient,
    content_types: &'a dyn ContentTypeClient,
}

impl<'a> ContentTypeDriver<'a> {
    pub fn new(
        environments: &'a dyn EnvironmentClient,
        content_types: &'a dyn ContentTypeClient,
    ) -> Self {
        Self {
            environments,
            content_types,
        }
    }

    fn environment(
        &self,
        ctx: &ReconcileContext,
        spec: &ContentTypeSpec,
    ) -> Result<Environment, StepError> {
        ctx.call(&format!("environment.get {}", spec.env_id), || {
            self.environments.get(&spec.space_id, &spec.env_id)
        })
    }

    fn get(
        &self,
        ctx: &ReconcileContext,
        env: &Environment,
        id: &str,
    ) -> Result<ContentType, StepError> {
        ctx.call(&format!("content_type.get {id}"), || {
            self.content_types.get(env, id)
        })
    }

    /// Upsert then activate. On failure, also returns the upserted draft if
    /// the upsert itself went through.
    fn upsert_and_activate(
        &self,
        ctx: &ReconcileContext,
        env: &Environment,
        ct: &ContentType,
    ) -> Result<ContentType, (StepError, Option<ContentType>)> {
        let draft = ctx
            .call("content_type.upsert", || self.content_types.upsert(env, ct))
            .map_err(|err| (err, None))?;
        ctx.call("content_type.activate", || {
            self.content_types.activate(env, &draft)
        })
        .map_err(|err| (err, Some(draft)))
    }

    /// Failure of an update step, reporting the state the remote holds now.
    ///
    /// Falls back to `fallback` when the re-read itself fails.
    fn partial_failure(
        &self,
        ctx: &ReconcileContext,
        env: &Environment,
        fallback: &ContentType,
        err: StepError,
    ) -> Failure<ContentTypeState> {
        warn!("{} {} left partially updated: {err}", self.kind(), fallback.sys.id);
        let observed = match err {
            StepError::Cancelled(_) => None,
            StepError::Remote(_) => self.get(ctx, env, &fallback.sys.id).ok(),
        };
        let state = ContentTypeState::from(observed.as_ref().unwrap_or(fallback));
        Failure::from(err).with_last_known(state)
    }
}

impl Driver for ContentTypeDriver<'_> {
    type Spec = ContentTypeSpec;
    type State = ContentTypeState;

    fn kind(&self) -> &'static str {
        "content_type"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &ContentTypeSpec) -> Outcome<ContentTypeState> {
        let fields = build_fields(&spec.fields)?;
        let env = self.environment(ctx, spec)?;

        let ct = ContentType {
            sys: spec
                .content_type_id
                .as_deref()
                .map(Sys::with_id)
                .unwrap_or_default(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            display_field: spec.display_field.clone(),
            fields,
        };

        match self.upsert_and_activate(ctx, &env, &ct) {
            Ok(active) => {
                info!(
                    "Created {} {} (version {})",
                    self.kind(),
                    active.sys.id,
                    active.sys.version
                );
                Ok(ContentTypeState::from(&active))
            }
            Err((err, Some(draft))) => {
                Err(Failure::from(err).with_last_known(ContentTypeState::from(&draft)))
            }
            Err((err, None)) => Err(err.into()),
        }
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &ContentTypeSpec,
    ) -> Result<ReadOutcome<ContentTypeState>, Failure<ContentTypeState>> {
        let env = self.environment(ctx, spec)?;
        gone_if_missing(
            self.get(ctx, &env, id)
                .map(|ct| ContentTypeState::from(&ct)),
        )
    }

    fn update(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &ContentTypeSpec,
    ) -> Outcome<ContentTypeState> {
        let desired = build_fields(&spec.fields)?;
        let env = self.environment(ctx, spec)?;
        let mut current = self.get(ctx, &env, id)?;

        current.name = spec.name.clone();
        current.display_field = spec.display_field.clone();
        if let Some(description) = &spec.description {
            current.description = Some(description.clone());
        }

        for pass in schedule(&current.fields, &desired) {
            info!(
                "Applying {} pass to content type {id} ({} fields)",
                pass.kind,
                pass.fields.len()
            );
            let draft = ContentType {
                fields: pass.fields,
                ..current.clone()
            };
            match self.upsert_and_activate(ctx, &env, &draft) {
                Ok(next) => current = next,
                Err((err, upserted)) => {
                    let fallback = upserted.as_ref().unwrap_or(&current);
                    return Err(self.partial_failure(ctx, &env, fallback, err));
                }
            }
        }

        Ok(ContentTypeState::from(&current))
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &ContentTypeSpec,
    ) -> Result<(), Failure<ContentTypeState>> {
        let env = self.environment(ctx, spec)?;
        let ct = self.get(ctx, &env, id)?;
        let inactive = ctx.call(&format!("content_type.deactivate {id}"), || {
            self.content_types.deactivate(&env, &ct)
        })?;
        ctx.call(&format!("content_type.delete {id}"), || {
            self.content_types.delete(&env, &inactive)
        })?;
        info!("Deleted {} {id}", self.kind());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::format_path;
    use cmakit::{MemoryBackend, RemoteError};

    fn spec(fields: Vec<FieldSpec>) -> ContentTypeSpec {
        ContentTypeSpec {
            space_id: "space1".to_string(),
            env_id: "master".to_string(),
            content_type_id: Some("post".to_string()),
            name: "Post".to_string(),
            description: Some("Blog post".to_string()),
            display_field: "title".to_string(),
            fields,
        }
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed_space("space1", "Test");
        backend
    }

    #[test]
    fn test_create_upserts_and_activates() {
        let backend = backend();
        let driver = ContentTypeDriver::new(&backend, &backend);
        let ctx = ReconcileContext::new();

        let state = driver
            .create(&ctx, &spec(vec![FieldSpec::new("title", "Title", "Symbol")]))
            .unwrap();

        assert_eq!(state.id, "post");
        assert_eq!(state.version, 2);
        assert_eq!(
            backend.calls(),
            vec![
                "environment.get",
                "content_type.upsert",
                "content_type.activate"
            ]
        );
    }

    #[test]
    fn test_invalid_rules_fail_before_any_call() {
        let backend = backend();
        let driver = ContentTypeDriver::new(&backend, &backend);
        let ctx = ReconcileContext::new();

        let mut broken = FieldSpec::new("title", "Title", "Symbol");
        broken.validations = vec!["{".to_string()];
        let mut also_broken = FieldSpec::new("body", "Body", "Text");
        also_broken.validations = vec!["[]".to_string()];

        let failure = driver
            .create(&ctx, &spec(vec![broken, also_broken]))
            .unwrap_err();

        assert_eq!(failure.diagnostics.len(), 2);
        assert_eq!(
            format_path(&failure.diagnostics[1].attribute_path),
            "field[1].validations"
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_spec_from_toml_field_tables() {
        let spec: ContentTypeSpec = toml::from_str(
            r#"
space_id = "space1"
name = "Post"
display_field = "title"

[[field]]
id = "title"
name = "Title"
type = "Symbol"
validations = ['{"size": {"max": 80}}']
"#,
        )
        .unwrap();

        assert_eq!(spec.env_id, "master");
        assert!(spec.content_type_id.is_none());
        assert_eq!(spec.fields[0].validations.len(), 1);
    }

    #[test]
    fn test_read_missing_content_type_is_gone() {
        let backend = backend();
        let driver = ContentTypeDriver::new(&backend, &backend);
        let ctx = ReconcileContext::new();

        let outcome = driver.read(&ctx, "nope", &spec(Vec::new())).unwrap();
        assert_eq!(outcome, ReadOutcome::Gone);
    }

    #[test]
    fn test_failed_activation_reports_reread_state() {
        let backend = backend();
        let driver = ContentTypeDriver::new(&backend, &backend);
        let ctx = ReconcileContext::new();
        driver
            .create(&ctx, &spec(vec![FieldSpec::new("title", "Title", "Symbol")]))
            .unwrap();

        backend.fail_next(
            "content_type.activate",
            RemoteError::Other("activation timed out".to_string()),
        );
        let failure = driver
            .update(
                &ctx,
                "post",
                &spec(vec![
                    FieldSpec::new("title", "Title", "Symbol"),
                    FieldSpec::new("body", "Body", "Text"),
                ]),
            )
            .unwrap_err();

        assert_eq!(failure.diagnostics[0].summary, "activation timed out");
        let last_known = failure.last_known.unwrap();
        // the upsert went through, the activation did not
        assert_eq!(last_known.version, 3);
        assert_eq!(last_known.fields.len(), 2);
    }

    #[test]
    fn test_delete_deactivates_first() {
        let backend = backend();
        let driver = ContentTypeDriver::new(&backend, &backend);
        let ctx = ReconcileContext::new();
        driver
            .create(&ctx, &spec(vec![FieldSpec::new("title", "Title", "Symbol")]))
            .unwrap();
        backend.clear_calls();

        driver.delete(&ctx, "post", &spec(Vec::new())).unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "environment.get",
                "content_type.get",
                "content_type.deactivate",
                "content_type.delete"
            ]
        );
        assert_eq!(
            driver.read(&ctx, "post", &spec(Vec::new())).unwrap(),
            ReadOutcome::Gone
        );
    }
}
