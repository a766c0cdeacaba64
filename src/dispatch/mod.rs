//! Main-thread dispatch: run blocking work off the main thread and deliver
//! its result back to the main thread.
//!
//! # Components
//!
//! - [`Dispatcher`]: accepts work items, hands them to an [`Executor`] and
//!   posts each result to a [`MainThreadHost`].
//! - [`MainLoop`]: a headless main-thread event loop; its [`MainLoopHandle`]
//!   is the default host.
//! - [`Executor`] strategies: [`ThreadExecutor`], [`PoolExecutor`],
//!   [`TaskExecutor`], built from a [`Strategy`] by [`WorkerRuntime`].
//! - [`BackgroundTask`]: pre-execute / background / progress / post-execute
//!   hooks driven by [`Dispatcher::execute_task`].
//! - `SlintHost` (feature `slint`): delivers results onto a Slint event loop.
//!
//! # Threading model
//!
//! One main thread owns all presentation state and drains the callback
//! queue. Any number of workers run work bodies. The callback queue is the
//! only structure both sides touch.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handle;
pub mod host;
pub mod job;
pub mod main_loop;
pub mod runtime;
#[cfg(feature = "slint")]
pub mod slint_host;
pub mod task;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, RejectReason, WorkFailure, WorkResult};
pub use executor::{Executor, PoolExecutor, Strategy, TaskExecutor, ThreadExecutor};
pub use handle::{WorkHandle, WorkId, WorkState};
pub use host::{MainJob, MainThreadHost};
pub use job::{Execution, Job};
pub use main_loop::{MainLoop, MainLoopHandle};
pub use runtime::WorkerRuntime;
#[cfg(feature = "slint")]
pub use slint_host::SlintHost;
pub use task::{Background, BackgroundTask, TaskContext};
