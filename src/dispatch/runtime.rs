use crate::dispatch::error::DispatchError;
use crate::dispatch::executor::{Executor, PoolExecutor, Strategy, TaskExecutor, ThreadExecutor};
use crate::models::DispatchSettings;
use std::sync::Arc;
use std::time::Duration;

/// Multi-threaded tokio runtime backing the pool and task strategies
///
/// The thread strategy does not need it, but every strategy is built through
/// here so the dispatcher's caller never has to care which one it picked.
pub struct WorkerRuntime {
    runtime: tokio::runtime::Runtime,
    thread_name: String,
}

impl WorkerRuntime {
    /// Build the runtime from dispatch settings
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Runtime`] if the OS refuses the worker threads.
    pub fn new(settings: &DispatchSettings) -> Result<Self, DispatchError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(settings.worker_threads.max(1))
            .max_blocking_threads(settings.max_in_flight.max(1))
            .thread_name(settings.thread_name.clone())
            .build()?;

        tracing::info!(
            "Worker runtime initialized with {} worker threads",
            settings.worker_threads
        );

        Ok(Self {
            runtime,
            thread_name: settings.thread_name.clone(),
        })
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        self.runtime.handle()
    }

    /// Build the executor for a strategy
    pub fn executor(&self, strategy: Strategy) -> Arc<dyn Executor> {
        let handle = self.runtime.handle().clone();
        match strategy {
            Strategy::Thread => Arc::new(ThreadExecutor::new(self.thread_name.clone())),
            Strategy::Pool => Arc::new(PoolExecutor::new(handle)),
            Strategy::Task => Arc::new(TaskExecutor::new(handle)),
        }
    }

    /// Shut the runtime down, waiting up to `timeout` for blocking work
    ///
    /// Jobs still queued on the pool are dropped and report as abandoned.
    pub fn shutdown(self, timeout: Duration) {
        tracing::info!("Shutting down worker runtime");
        self.runtime.shutdown_timeout(timeout);
    }
}
