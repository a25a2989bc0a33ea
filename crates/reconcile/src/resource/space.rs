//! Space driver

use super::{Driver, Failure, Outcome, ReadOutcome, deleted_unless_failed, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use cmakit::{Space, SpaceClient, Sys};
use log::info;
use serde::{Deserialize, Serialize};

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSpec {
    pub name: String,
    /// Only applied on creation
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceState {
    pub id: String,
    pub version: u64,
    pub name: String,
    pub default_locale: String,
}

impl From<&Space> for SpaceState {
    fn from(space: &Space) -> Self {
        Self {
            id: space.sys.id.clone(),
            version: space.sys.version,
            name: space.name.clone(),
            default_locale: space.default_locale.clone(),
        }
    }
}

pub struct SpaceDriver<'a> {
    spaces: &'a dyn SpaceClient,
}

impl<'a> SpaceDriver<'a> {
    pub fn new(spaces: &'a dyn SpaceClient) -> Self {
        Self { spaces }
    }

    fn get(&self, ctx: &ReconcileContext, id: &str) -> Result<Space, StepError> {
        ctx.call(&format!("space.get {id}"), || self.spaces.get(id))
    }
}

impl Driver for SpaceDriver<'_> {
    type Spec = SpaceSpec;
    type State = SpaceState;

    fn kind(&self) -> &'static str {
        "space"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &SpaceSpec) -> Outcome<SpaceState> {
        let space = Space {
            sys: Sys::default(),
            name: spec.name.clone(),
            default_locale: spec.default_locale.clone(),
        };
        let created = ctx.call("space.upsert", || self.spaces.upsert(&space))?;
        info!("Created {} {}", self.kind(), created.sys.id);
        Ok(SpaceState::from(&created))
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        _spec: &SpaceSpec,
    ) -> Result<ReadOutcome<SpaceState>, Failure<SpaceState>> {
        gone_if_missing(self.get(ctx, id).map(|space| SpaceState::from(&space)))
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &SpaceSpec) -> Outcome<SpaceState> {
        let mut space = self.get(ctx, id)?;
        space.name = spec.name.clone();
        let updated = ctx.call(&format!("space.upsert {id}"), || self.spaces.upsert(&space))?;
        Ok(SpaceState::from(&updated))
    }

    /// The lookup must find the space; a NotFound from the delete call
    /// itself is accepted.
    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        _spec: &SpaceSpec,
    ) -> Result<(), Failure<SpaceState>> {
        let space = self.get(ctx, id)?;
        let result = ctx.call(&format!("space.delete {id}"), || self.spaces.delete(&space));
        deleted_unless_failed(self.kind(), id, result)?;
        Ok(())
    }
}
