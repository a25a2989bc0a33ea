//! Reconciliation drivers, one per remote object kind
//!
//! A driver takes a desired snapshot (`Spec`), issues the remote calls that
//! converge the live object to it, and reports the canonical attributes
//! (`State`) the host should record. Each driver borrows only the client
//! traits it needs.
//!
//! Failures carry diagnostics plus the last state observed on the remote,
//! so a host can record partial progress of a multi-step update.

pub mod api_key;
pub mod asset;
pub mod content_type;
pub mod entry;
pub mod environment;
pub mod locale;
pub mod space;

pub use api_key::{ApiKeyDriver, ApiKeySpec, ApiKeyState};
pub use asset::{AssetDriver, AssetFieldsSpec, AssetSpec, AssetState, FileSpec, LocalizedText};
pub use content_type::{ContentTypeDriver, ContentTypeSpec, ContentTypeState};
pub use entry::{EntryDriver, EntryFieldSpec, EntrySpec, EntryState};
pub use environment::{EnvironmentDriver, EnvironmentSpec, EnvironmentState};
pub use locale::{LocaleDriver, LocaleSpec, LocaleState};
pub use space::{SpaceDriver, SpaceSpec, SpaceState};

use crate::context::{ReconcileContext, StepError};
use crate::diagnostic::Diagnostic;
use log::info;
use std::fmt;

/// A failed driver operation
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<S> {
    pub diagnostics: Vec<Diagnostic>,
    /// State observed on the remote before the failure, if any write succeeded
    pub last_known: Option<S>,
}

impl<S> Failure<S> {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            last_known: None,
        }
    }

    pub fn with_last_known(mut self, state: S) -> Self {
        self.last_known = Some(state);
        self
    }
}

impl<S> From<StepError> for Failure<S> {
    fn from(err: StepError) -> Self {
        Self::new(err.into_diagnostics())
    }
}

impl<S> From<Vec<Diagnostic>> for Failure<S> {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(diagnostics)
    }
}

impl<S> fmt::Display for Failure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// Result of a driver write
pub type Outcome<S> = Result<S, Failure<S>>;

/// Result of a driver read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<S> {
    /// The object exists
    Present(S),
    /// The object no longer exists; the host should drop its identity
    Gone,
}

impl<S> ReadOutcome<S> {
    pub fn present(self) -> Option<S> {
        match self {
            Self::Present(state) => Some(state),
            Self::Gone => None,
        }
    }
}

/// Host-facing contract of every driver
pub trait Driver {
    /// Desired snapshot supplied by the host
    type Spec;
    /// Canonical attributes reported back
    type State;

    /// Object kind, used in log lines
    fn kind(&self) -> &'static str;

    fn create(&self, ctx: &ReconcileContext, spec: &Self::Spec) -> Outcome<Self::State>;

    /// Read the live object. `spec` only supplies the scope.
    fn read(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &Self::Spec,
    ) -> Result<ReadOutcome<Self::State>, Failure<Self::State>>;

    fn update(&self, ctx: &ReconcileContext, id: &str, spec: &Self::Spec)
    -> Outcome<Self::State>;

    fn delete(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        spec: &Self::Spec,
    ) -> Result<(), Failure<Self::State>>;
}

/// Environment used when a spec names none
pub(crate) fn default_environment() -> String {
    "master".to_string()
}

/// Map a failed lookup of the object itself to `Gone`.
pub(crate) fn gone_if_missing<S>(
    result: Result<S, StepError>,
) -> Result<ReadOutcome<S>, Failure<S>> {
    match result {
        Ok(state) => Ok(ReadOutcome::Present(state)),
        Err(err) if err.is_not_found() => Ok(ReadOutcome::Gone),
        Err(err) => Err(err.into()),
    }
}

/// Treat a NotFound answer to the delete call itself as a completed delete.
pub(crate) fn deleted_unless_failed(
    kind: &str,
    id: &str,
    result: Result<(), StepError>,
) -> Result<(), StepError> {
    match result {
        Err(err) if err.is_not_found() => {
            info!("{kind} {id} already deleted");
            Ok(())
        }
        other => other,
    }
}
