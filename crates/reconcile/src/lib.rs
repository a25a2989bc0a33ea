//! # reconcile
//!
//! Converge a remote content management space to a declared state.
//!
//! ## Core Concepts
//!
//! - **Field plan**: the remote only deletes or retypes a field after its
//!   omission was activated. [`fields::plan`] computes the intermediate field
//!   lists, [`fields::schedule`] orders the passes a content-type update writes.
//! - **Lifecycle**: publish/unpublish then archive/unarchive, each call made
//!   with the object returned by the previous one ([`lifecycle::reconcile`]).
//! - **Diagnostics**: remote failures become attribute-addressed
//!   [`Diagnostic`]s ([`diagnostic::translate`]).
//! - **Drivers**: one [`resource::Driver`] per object kind, each borrowing
//!   only the client traits it needs.
//!
//! ## Example
//!
//! ```
//! use cmakit::MemoryBackend;
//! use reconcile::fields::FieldSpec;
//! use reconcile::resource::{ContentTypeDriver, ContentTypeSpec, Driver};
//! use reconcile::ReconcileContext;
//!
//! let backend = MemoryBackend::new();
//! backend.seed_space("space1", "Demo");
//! let driver = ContentTypeDriver::new(&backend, &backend);
//!
//! let spec = ContentTypeSpec {
//!     space_id: "space1".into(),
//!     env_id: "master".into(),
//!     content_type_id: Some("post".into()),
//!     name: "Post".into(),
//!     description: None,
//!     display_field: "title".into(),
//!     fields: vec![FieldSpec::new("title", "Title", "Symbol")],
//! };
//! let state = driver.create(&ReconcileContext::new(), &spec).unwrap();
//! assert_eq!(state.id, "post");
//! ```

pub mod context;
pub mod diagnostic;
pub mod fields;
pub mod lifecycle;
pub mod resource;
pub mod validation;

pub use context::{CancelHandle, ReconcileContext, StepError};
pub use diagnostic::{Diagnostic, PathStep, Severity, translate};
pub use fields::{FieldPlan, FieldSpec, ItemsSpec, Pass, PassKind, plan, schedule};
pub use lifecycle::{LifecycleFailure, LifecycleState, Transition, plan_transitions};
pub use resource::{Driver, Failure, Outcome, ReadOutcome};
pub use validation::{ValidationError, build_fields};
