//! Reconciliation context and step errors
//!
//! Every remote call a driver issues goes through [`ReconcileContext::call`],
//! which checks for cancellation first and logs the call.

use crate::diagnostic::{Diagnostic, translate};
use cmakit::RemoteError;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Failure of a single reconciliation step
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The remote rejected or failed the call
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The host cancelled the operation before this step ran
    #[error("cancelled before {0}")]
    Cancelled(String),
}

impl StepError {
    /// Whether the remote reported the object as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_not_found())
    }

    /// Convert into host diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Remote(err) => translate(&err),
            Self::Cancelled(operation) => vec![
                Diagnostic::error("operation cancelled")
                    .with_detail(format!("cancelled before {operation}")),
            ],
        }
    }
}

/// Handle a host keeps to cancel a running operation from another thread
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Context passed to every driver operation
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    cancelled: Arc<AtomicBool>,
}

impl ReconcileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that cancels this context (and its clones)
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Issue one remote call unless the operation was cancelled.
    ///
    /// Calls already made are never rolled back.
    pub fn call<T>(
        &self,
        operation: &str,
        f: impl FnOnce() -> cmakit::Result<T>,
    ) -> Result<T, StepError> {
        if self.is_cancelled() {
            warn!("Skipping {operation}: cancelled");
            return Err(StepError::Cancelled(operation.to_string()));
        }
        debug!("Calling {operation}");
        f().map_err(|err| {
            debug!("{operation} failed: {err}");
            StepError::Remote(err)
        })
    }
}
