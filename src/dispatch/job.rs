use crate::dispatch::handle::WorkId;
use std::fmt;

/// How a job's body is being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// A worker is running the job
    Run,
    /// The job was dropped without running
    Abandon,
}

type JobBody = Box<dyn FnOnce(Execution) + Send + 'static>;

/// Executor-facing envelope of a dispatched work item
///
/// A job reports exactly once. Calling [`Job::run`] runs the work and posts
/// its completion; dropping the job unrun posts an abandoned completion
/// instead, so an executor that loses work cannot lose the callback with it.
pub struct Job {
    id: WorkId,
    body: Option<JobBody>,
}

impl Job {
    pub(crate) fn new<F>(id: WorkId, body: F) -> Self
    where
        F: FnOnce(Execution) + Send + 'static,
    {
        Self {
            id,
            body: Some(Box::new(body)),
        }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Run the work on the current thread
    pub fn run(mut self) {
        if let Some(body) = self.body.take() {
            body(Execution::Run);
        }
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if let Some(body) = self.body.take() {
            tracing::warn!("{} dropped by its executor without running", self.id);
            body(Execution::Abandon);
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("pending", &self.body.is_some())
            .finish()
    }
}
