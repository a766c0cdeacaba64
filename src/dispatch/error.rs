use std::any::Any;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a dispatch was refused before any work was handed to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Every work slot is taken
    Saturated { capacity: usize },

    /// The dispatcher has been shut down
    ShutDown,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Saturated { capacity } => {
                write!(f, "all {} work slots are in use", capacity)
            }
            RejectReason::ShutDown => write!(f, "dispatcher has been shut down"),
        }
    }
}

/// Errors reported synchronously by the dispatcher and the main loop
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch rejected: {reason}")]
    Rejected { reason: RejectReason },

    #[error("Main thread host is no longer accepting callbacks")]
    HostUnavailable,

    #[error("Timed out after {0:?} waiting on the main loop")]
    Timeout(Duration),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl DispatchError {
    /// True for the errors that mean "the worker context cannot take this work"
    pub fn is_rejection(&self) -> bool {
        matches!(self, DispatchError::Rejected { .. })
    }
}

/// Failure captured from a work item and delivered to its completion callback
///
/// A `WorkFailure` never escapes the worker thread as a panic; it always
/// travels to the main thread inside a [`WorkResult`].
#[derive(Error, Debug)]
pub enum WorkFailure {
    #[error("Work panicked: {0}")]
    Panicked(String),

    #[error("Work failed: {0:#}")]
    Errored(anyhow::Error),

    #[error("Work was cancelled before it started")]
    Cancelled,

    #[error("Work was dropped by its executor before it could run")]
    Abandoned,
}

impl WorkFailure {
    /// Build a failure from a panic payload caught with `catch_unwind`
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        WorkFailure::Panicked(message)
    }

    /// The original error text, without the failure-kind prefix
    pub fn message(&self) -> String {
        match self {
            WorkFailure::Panicked(message) => message.clone(),
            WorkFailure::Errored(error) => format!("{:#}", error),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkFailure::Cancelled)
    }
}

/// Outcome of a work item as seen by its completion callback
pub type WorkResult<T> = Result<T, WorkFailure>;
