//! Locale driver

use super::{Driver, Failure, Outcome, ReadOutcome, deleted_unless_failed, gone_if_missing};
use crate::context::{ReconcileContext, StepError};
use cmakit::{Locale, LocaleClient};
use serde::{Deserialize, Serialize};

fn default_fallback_code() -> String {
    "en-US".to_string()
}

const fn default_true() -> bool {
    true
}

/// Desired locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSpec {
    pub space_id: String,
    pub name: String,
    pub code: String,
    #[serde(default = "default_fallback_code")]
    pub fallback_code: String,
    #[serde(default)]
    pub optional: bool,
    /// Available through the delivery API
    #[serde(default = "default_true")]
    pub cda: bool,
    /// Available through the management API
    #[serde(default)]
    pub cma: bool,
}

impl LocaleSpec {
    /// Spec with every optional attribute at its default
    pub fn new(space_id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            name: name.into(),
            code: code.into(),
            fallback_code: default_fallback_code(),
            optional: false,
            cda: true,
            cma: false,
        }
    }

    fn apply_to(&self, locale: &mut Locale) {
        locale.name = self.name.clone();
        locale.code = self.code.clone();
        locale.fallback_code = self.fallback_code.clone();
        locale.optional = self.optional;
        locale.cda = self.cda;
        locale.cma = self.cma;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleState {
    pub id: String,
    pub version: u64,
    pub name: String,
    pub code: String,
    pub fallback_code: String,
    pub optional: bool,
    pub cda: bool,
    pub cma: bool,
}

impl From<&Locale> for LocaleState {
    fn from(locale: &Locale) -> Self {
        Self {
            id: locale.sys.id.clone(),
            version: locale.sys.version,
            name: locale.name.clone(),
            code: locale.code.clone(),
            fallback_code: locale.fallback_code.clone(),
            optional: locale.optional,
            cda: locale.cda,
            cma: locale.cma,
        }
    }
}

pub struct LocaleDriver<'a> {
    locales: &'a dyn LocaleClient,
}

impl<'a> LocaleDriver<'a> {
    pub fn new(locales: &'a dyn LocaleClient) -> Self {
        Self { locales }
    }

    fn get(&self, ctx: &ReconcileContext, space_id: &str, id: &str) -> Result<Locale, StepError> {
        ctx.call(&format!("locale.get {id}"), || self.locales.get(space_id, id))
    }

    fn upsert(&self, ctx: &ReconcileContext, space_id: &str, locale: &Locale) -> Outcome<LocaleState> {
        let written = ctx.call(&format!("locale.upsert {}", locale.code), || {
            self.locales.upsert(space_id, locale)
        })?;
        Ok(LocaleState::from(&written))
    }
}

impl Driver for LocaleDriver<'_> {
    type Spec = LocaleSpec;
    type State = LocaleState;

    fn kind(&self) -> &'static str {
        "locale"
    }

    fn create(&self, ctx: &ReconcileContext, spec: &LocaleSpec) -> Outcome<LocaleState> {
        let mut locale = Locale::default();
        spec.apply_to(&mut locale);
        self.upsert(ctx, &spec.space_id, &locale)
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &LocaleSpec,
    ) -> Result<ReadOutcome<LocaleState>, Failure<LocaleState>> {
        gone_if_missing(
            self.get(ctx, &spec.space_id, id)
                .map(|locale| LocaleState::from(&locale)),
        )
    }

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &LocaleSpec) -> Outcome<LocaleState> {
        let mut locale = self.get(ctx, &spec.space_id, id)?;
        spec.apply_to(&mut locale);
        self.upsert(ctx, &spec.space_id, &locale)
    }

    /// The lookup must find the locale; a NotFound from the delete call
    /// itself is accepted.
    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &LocaleSpec,
    ) -> Result<(), Failure<LocaleState>> {
        let locale = self.get(ctx, &spec.space_id, id)?;
        let result = ctx.call(&format!("locale.delete {id}"), || {
            self.locales.delete(&spec.space_id, &locale)
        });
        deleted_unless_failed(self.kind(), id, result)?;
        Ok(())
    }
}
