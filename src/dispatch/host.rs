use crate::dispatch::error::DispatchError;

/// A callback bound for the main thread
pub type MainJob = Box<dyn FnOnce() + Send + 'static>;

/// Capability to schedule a callback onto the host's main-thread event loop
///
/// Implementations must return without waiting for the callback to run, and
/// must run accepted callbacks in the order they were posted.
#[cfg_attr(test, mockall::automock)]
pub trait MainThreadHost: Send + Sync {
    /// Enqueue `job` for the main thread and wake the loop if it is idle
    ///
    /// # Errors
    ///
    /// [`DispatchError::HostUnavailable`] once the event loop has gone away.
    fn post(&self, job: MainJob) -> Result<(), DispatchError>;
}
