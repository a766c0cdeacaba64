use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Identifier of one dispatched work item, unique per dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkId(pub u64);

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work-{}", self.0)
    }
}

/// Lifecycle of a dispatched work item
///
/// `Pending -> Running -> Completed | Failed`. A cancelled or abandoned item
/// goes straight from `Pending` to `Failed`. The terminal state is set just
/// before the completion callback is posted to the main thread, and stays set
/// if that post fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkState::Completed | WorkState::Failed)
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkState::Pending => "pending",
            WorkState::Running => "running",
            WorkState::Completed => "completed",
            WorkState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Cloneable view of a dispatched work item
///
/// The handle never carries the result itself; results always go to the
/// completion callback on the main thread.
#[derive(Debug, Clone)]
pub struct WorkHandle {
    id: WorkId,
    state_rx: watch::Receiver<WorkState>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl WorkHandle {
    pub(crate) fn new(
        id: WorkId,
        state_rx: watch::Receiver<WorkState>,
        cancel_tx: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            id,
            state_rx,
            cancel_tx,
        }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Current state of the work item
    pub fn state(&self) -> WorkState {
        *self.state_rx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cooperative cancellation
    ///
    /// Work that has not started yet is skipped and reported as
    /// [`WorkFailure::Cancelled`](crate::dispatch::WorkFailure::Cancelled).
    /// Work that is already running is never interrupted; background tasks
    /// may observe the request through their context.
    pub fn cancel(&self) {
        tracing::debug!("Cancellation requested for {}", self.id);
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Wait until the work item reaches a terminal state
    ///
    /// Resolves once the work has finished and its completion has been handed
    /// to the host, which may be before the main thread has run it. The state
    /// is terminal even when the host has gone away and the completion is
    /// undeliverable; that case is logged and counted in
    /// [`Metrics::callbacks_undeliverable`](crate::metrics::Metrics::callbacks_undeliverable).
    pub async fn finished(&mut self) -> WorkState {
        let waited = self
            .state_rx
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        // The job always publishes a terminal state before dropping its sender
        waited.unwrap_or_else(|_| *self.state_rx.borrow())
    }
}
