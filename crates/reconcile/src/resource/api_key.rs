//! API key driver. The access token is assigned by the remote.

use super::{Driver, Failure, Outcome, ReadOutcome, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use cmakit::{ApiKey, ApiKeyClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySpec {
    pub space_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyState {
    pub id: String,
    pub version: u64,
    pub name: String,
    pub description: String,
    pub access_token: String,
}

impl From<&ApiKey> for ApiKeyState {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.sys.id.clone(),
            version: key.sys.version,
            name: key.name.clone(),
            description: key.description.clone(),
            access_token: key.access_token.clone(),
        }
    }
}

pub struct ApiKeyDriver<'a> {
    api_keys: &'a dyn ApiKeyClient,
}

impl<'a> ApiKeyDriver<'a> {
    pub fn new(api_keys: &'a dyn ApiKeyClient) -> Self {
        Self { api_keys }
    }

    fn get(&self, ctx: &ReconcileContext, space_id: &str, id: &str) -> Result<ApiKey, StepError> {
        ctx.call(&format!("api_key.get {id}"), || self.api_keys.get(space_id, id))
    }

    fn upsert(&self, ctx: &ReconcileContext, space_id: &str, key: &ApiKey) -> Outcome<ApiKeyState> {
        let written = ctx.call(&format!("api_key.upsert {}", key.name), || {
            self.api_keys.upsert(space_id, key)
        })?;
        Ok(ApiKeyState::from(&written))
    }
}

impl Driver for ApiKeyDriver<'_> {
    type Spec = ApiKeySpec;
    type State = ApiKeyState;

    fn kind(&self) -> &'static str {
        "api_key"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &ApiKeySpec) -> Outcome<ApiKeyState> {
        let key = ApiKey {
            name: spec.name.clone(),
            description: spec.description.clone(),
            ..ApiKey::default()
        };
        self.upsert(ctx, &spec.space_id, &key)
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &ApiKeySpec,
    ) -> Result<ReadOutcome<ApiKeyState>, Failure<ApiKeyState>> {
        gone_if_missing(
            self.get(ctx, &spec.space_id, id)
                .map(|key| ApiKeyState::from(&key)),
        )
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &ApiKeySpec) -> Outcome<ApiKeyState> {
        let mut key = self.get(ctx, &spec.space_id, id)?;
        key.name = spec.name.clone();
        key.description = spec.description.clone();
        self.upsert(ctx, &spec.space_id, &key)
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &ApiKeySpec,
    ) -> Result<(), Failure<ApiKeyState>> {
        let key = self.get(ctx, &spec.space_id, id)?;
        ctx.call(&format!("api_key.delete {id}"), || {
            self.api_keys.delete(&spec.space_id, &key)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmakit::MemoryBackend;

    #[test]
    fn test_access_token_survives_update() {
        let backend = MemoryBackend::new();
        backend.seed_space("space1", "Test");
        let driver = ApiKeyDriver::new(&backend);
        let ctx = ReconcileContext::new();
        let mut spec = ApiKeySpec {
            space_id: "space1".to_string(),
            name: "website".to_string(),
            description: String::new(),
        };

        let created = driver.create(&ctx, &spec).unwrap();
        assert!(!created.access_token.is_empty());

        spec.description = "Public site".to_string();
        let updated = driver.update(&ctx, &created.id, &spec).unwrap();
        assert_eq!(updated.access_token, created.access_token);
        assert_eq!(updated.description, "Public site");
    }
}
