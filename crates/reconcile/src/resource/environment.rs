//! Environment driver. An environment's id is its name.

use super::{Driver, Failure, Outcome, ReadOutcome, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use cmakit::{Environment, EnvironmentClient, Sys};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub space_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub id: String,
    pub version: u64,
    pub space_id: String,
    pub name: String,
}

impl From<&Environment> for EnvironmentState {
    fn from(env: &Environment) -> Self {
        Self {
            id: env.sys.id.clone(),
            version: env.sys.version,
            space_id: env.sys.space_id.clone(),
            name: env.name.clone(),
        }
    }
}

pub struct EnvironmentDriver<'a> {
    environments: &'a dyn EnvironmentClient,
}

impl<'a> EnvironmentDriver<'a> {
    pub fn new(environments: &'a dyn EnvironmentClient) -> Self {
        Self { environments }
    }

    fn get(&self, ctx: &ReconcileContext, space_id: &str, id: &str) -> Result<Environment, StepError> {
        ctx.call(&format!("environment.get {id}"), || {
            self.environments.get(space_id, id)
        })
    }

    fn upsert(&self, ctx: &ReconcileContext, space_id: &str, env: &Environment) -> Outcome<EnvironmentState> {
        let written = ctx.call(&format!("environment.upsert {}", env.name), || {
            self.environments.upsert(space_id, env)
        })?;
        Ok(EnvironmentState::from(&written))
    }
}

impl Driver for EnvironmentDriver<'_> {
    type Spec = EnvironmentSpec;
    type State = EnvironmentState;

    fn kind(&self) -> &'static str {
        "environment"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &EnvironmentSpec) -> Outcome<EnvironmentState> {
        let env = Environment {
            sys: Sys::with_id(spec.name.clone()),
            name: spec.name.clone(),
        };
        self.upsert(ctx, &spec.space_id, &env)
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &EnvironmentSpec,
    ) -> Result<ReadOutcome<EnvironmentState>, Failure<EnvironmentState>> {
        gone_if_missing(
            self.get(ctx, &spec.space_id, id)
                .map(|env| EnvironmentState::from(&env)),
        )
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &EnvironmentSpec) -> Outcome<EnvironmentState> {
        let mut env = self.get(ctx, &spec.space_id, id)?;
        env.name = spec.name.clone();
        self.upsert(ctx, &spec.space_id, &env)
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &EnvironmentSpec,
    ) -> Result<(), Failure<EnvironmentState>> {
        let env = self.get(ctx, &spec.space_id, id)?;
        ctx.call(&format!("environment.delete {id}"), || {
            self.environments.delete(&spec.space_id, &env)
        })?;
        Ok(())
    }
}
