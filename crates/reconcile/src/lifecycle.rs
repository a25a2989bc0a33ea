//! Publish/archive lifecycle reconciliation for entries and assets
//!
//! Transitions are decided once, from the snapshot taken before any call:
//! publish or unpublish first, then archive or unarchive. Each call is made
//! with the object returned by the previous one so it carries the current
//! version. The first failing call aborts the remaining transitions.

use crate::context::{ReconcileContext, StepError};
use cmakit::{LifecycleOps, Versioned};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Published/archived flags of an object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub published: bool,
    pub archived: bool,
}

impl LifecycleState {
    pub fn new(published: bool, archived: bool) -> Self {
        Self {
            published,
            archived,
        }
    }

    /// Flags observed on a remote object
    pub fn of(object: &impl Versioned) -> Self {
        Self::new(object.is_published(), object.is_archived())
    }
}

/// A lifecycle call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Publish,
    Unpublish,
    Archive,
    Unarchive,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => write!(f, "publish"),
            Self::Unpublish => write!(f, "unpublish"),
            Self::Archive => write!(f, "archive"),
            Self::Unarchive => write!(f, "unarchive"),
        }
    }
}

/// Ordered transitions that take `current` to `desired`.
pub fn plan_transitions(current: LifecycleState, desired: LifecycleState) -> Vec<Transition> {
    let mut transitions = Vec::with_capacity(2);
    if current.published != desired.published {
        transitions.push(if desired.published {
            Transition::Publish
        } else {
            Transition::Unpublish
        });
    }
    if current.archived != desired.archived {
        transitions.push(if desired.archived {
            Transition::Archive
        } else {
            Transition::Unarchive
        });
    }
    transitions
}

/// A transition failed; earlier transitions stay applied
#[derive(Debug)]
pub struct LifecycleFailure<O> {
    /// The transition that failed
    pub transition: Transition,
    /// The object as returned by the last successful call
    pub last_known: O,
    pub error: StepError,
}

/// Drive `current` to the `desired` flags.
///
/// Returns the object as left by the last call (or `current` unchanged when
/// no transition is needed).
pub fn reconcile<L: LifecycleOps>(
    ctx: &ReconcileContext,
    ops: &L,
    current: L::Object,
    desired: LifecycleState,
) -> Result<L::Object, LifecycleFailure<L::Object>> {
    let transitions = plan_transitions(LifecycleState::of(&current), desired);
    let mut object = current;

    for transition in transitions {
        let operation = format!("{transition} {}", object.id());
        let result = ctx.call(&operation, || match transition {
            Transition::Publish => ops.publish(&object),
            Transition::Unpublish => ops.unpublish(&object),
            Transition::Archive => ops.archive(&object),
            Transition::Unarchive => ops.unarchive(&object),
        });
        match result {
            Ok(next) => {
                info!("{operation}: now at version {}", next.version());
                object = next;
            }
            Err(error) => {
                warn!("{operation} failed, skipping remaining transitions: {error}");
                return Err(LifecycleFailure {
                    transition,
                    last_known: object,
                    error,
                });
            }
        }
    }

    Ok(object)
}
