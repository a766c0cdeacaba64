// Worker execution strategies
//
// The demo's point is that a raw thread, a pool and a task-with-continuation
// are interchangeable ways to get work off the main thread. Each is an
// `Executor`; the dispatcher never knows which one it holds.

use crate::dispatch::error::WorkFailure;
use crate::dispatch::handle::WorkId;
use crate::dispatch::job::Job;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

/// Worker execution backend selected in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One dedicated OS thread per work item
    Thread,
    /// The shared blocking pool of the worker runtime
    Pool,
    /// An async task that runs the work on the blocking pool and resumes as a continuation
    Task,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Thread, Strategy::Pool, Strategy::Task];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Thread => "thread",
            Strategy::Pool => "pool",
            Strategy::Task => "task",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability to run a job somewhere other than the main thread
///
/// `execute` must not block on the job. An executor that cannot run a job
/// simply drops it; the job then reports itself as abandoned.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, job: Job);
}

/// Spawns a named OS thread for every job
#[derive(Debug)]
pub struct ThreadExecutor {
    thread_name: String,
    spawned: AtomicU64,
}

impl ThreadExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            spawned: AtomicU64::new(0),
        }
    }
}

impl Executor for ThreadExecutor {
    fn name(&self) -> &'static str {
        Strategy::Thread.as_str()
    }

    fn execute(&self, job: Job) {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let id = job.id();
        let result = std::thread::Builder::new()
            .name(format!("{}-{}", self.thread_name, n))
            .spawn(move || job.run());

        // On failure the closure, and the job inside it, has already been dropped
        if let Err(e) = result {
            tracing::error!("Failed to spawn worker thread for {}: {}", id, e);
        }
    }
}

/// Queues jobs on the worker runtime's blocking pool
#[derive(Debug, Clone)]
pub struct PoolExecutor {
    handle: tokio::runtime::Handle,
}

impl PoolExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Executor for PoolExecutor {
    fn name(&self) -> &'static str {
        Strategy::Pool.as_str()
    }

    fn execute(&self, job: Job) {
        let id = job.id();
        // Detached: completion is reported by the job itself
        spawn_guarded(id, || {
            self.handle.spawn_blocking(move || job.run());
        });
    }
}

/// Run a spawn call that may panic, such as `spawn_blocking` when the OS
/// refuses a new thread, without letting the panic reach the dispatcher
///
/// A job owned by a panicking spawn is either dropped during unwinding or
/// left queued with the pool, and reports itself abandoned either way.
fn spawn_guarded<F: FnOnce()>(id: WorkId, spawn: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(spawn)) {
        tracing::error!(
            "Failed to hand {} to the blocking pool: {}",
            id,
            WorkFailure::from_panic(payload).message()
        );
    }
}

/// Starts an async task per job; the task hands the blocking body to the pool
/// and resumes once it returns
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    handle: tokio::runtime::Handle,
}

impl TaskExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Executor for TaskExecutor {
    fn name(&self) -> &'static str {
        Strategy::Task.as_str()
    }

    fn execute(&self, job: Job) {
        let id = job.id();
        self.handle.spawn(async move {
            match tokio::task::spawn_blocking(move || job.run()).await {
                Ok(()) => tracing::trace!("Continuation resumed after {}", id),
                Err(e) if e.is_panic() => {
                    tracing::error!("{} panicked outside its work body", id)
                }
                Err(_) => tracing::warn!("{} cancelled by runtime shutdown", id),
            }
        });
    }
}
