// Lifecycle-hook tasks
//
// A background task is split in two halves: hooks that own main-thread state
// and run only on the main thread, and a background body that owns only what
// it was handed. The dispatcher drives the hooks; nothing is inherited.

use crate::dispatch::error::WorkResult;
use tokio::sync::watch;

/// Worker-side body of a [`BackgroundTask`]
pub type Background<A, P, O> =
    Box<dyn FnOnce(A, &TaskContext<P>) -> anyhow::Result<O> + Send + 'static>;

/// A unit of background work with main-thread lifecycle hooks
///
/// Run with [`Dispatcher::execute_task`](crate::dispatch::Dispatcher::execute_task).
/// Hook order is always `on_pre_execute`, then zero or more
/// `on_progress_update`, then `on_post_execute`, all on the main thread.
pub trait BackgroundTask: Send + 'static {
    /// Arguments handed to the background body
    type Params: Send + 'static;

    /// Values published from the background body
    type Progress: Send + 'static;

    /// Result of the background body
    type Output: Send + 'static;

    /// Runs on the main thread before the background body is dispatched
    fn on_pre_execute(&mut self) {}

    /// Produce the body to run on a worker
    ///
    /// Called on the main thread right after `on_pre_execute`. The returned
    /// body must capture only what is safe to use off the main thread.
    fn background(&mut self) -> Background<Self::Params, Self::Progress, Self::Output>;

    /// Runs on the main thread for each value the body publishes
    fn on_progress_update(&mut self, _progress: Self::Progress) {}

    /// Runs on the main thread with the body's result
    fn on_post_execute(&mut self, result: WorkResult<Self::Output>);
}

/// What a background body may do besides its own work
pub struct TaskContext<P> {
    publish: Box<dyn Fn(P) + Send + Sync>,
    cancel_rx: watch::Receiver<bool>,
}

impl<P> TaskContext<P> {
    pub(crate) fn new<F>(publish: F, cancel_rx: watch::Receiver<bool>) -> Self
    where
        F: Fn(P) + Send + Sync + 'static,
    {
        Self {
            publish: Box::new(publish),
            cancel_rx,
        }
    }

    /// Send a progress value to `on_progress_update` on the main thread
    pub fn publish_progress(&self, progress: P) {
        (self.publish)(progress);
    }

    /// True once cancellation has been requested through the task's handle
    ///
    /// Bodies should check this at safe points and return early.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_context_publishes_and_observes_cancel() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let sink = Arc::clone(&published);
        let context = TaskContext::new(move |p: u8| sink.lock().unwrap().push(p), cancel_rx);

        context.publish_progress(10);
        context.publish_progress(20);
        assert!(!context.is_cancelled());

        cancel_tx.send_replace(true);

        assert!(context.is_cancelled());
        assert_eq!(*published.lock().unwrap(), vec![10, 20]);
    }
}
