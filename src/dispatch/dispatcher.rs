use crate::dispatch::error::{DispatchError, RejectReason, WorkFailure, WorkResult};
use crate::dispatch::executor::Executor;
use crate::dispatch::handle::{WorkHandle, WorkId, WorkState};
use crate::dispatch::host::MainThreadHost;
use crate::dispatch::job::{Execution, Job};
use crate::dispatch::task::{BackgroundTask, TaskContext};
use crate::metrics::Metrics;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError, watch};

/// Runs blocking work off the main thread and delivers each result back to it
///
/// A dispatcher pairs one [`Executor`] (where work runs) with one
/// [`MainThreadHost`] (where results are delivered). Swapping the executor
/// changes the backgrounding strategy without touching any caller.
///
/// # Guarantees
///
/// - `dispatch` never blocks and never runs the work on the calling thread.
/// - Each completion callback runs on the main thread strictly after its work
///   returned, and runs exactly once.
/// - Callbacks are queued in the order work items finish, not the order they
///   were dispatched.
/// - Panics and errors inside work are delivered as [`WorkFailure`].
///
/// # Example
/// ```ignore
/// let mut main_loop = MainLoop::new()?;
/// let runtime = WorkerRuntime::new(&settings.dispatch)?;
/// let dispatcher = Dispatcher::new(
///     runtime.executor(Strategy::Pool),
///     Arc::new(main_loop.handle()),
///     settings.dispatch.max_in_flight,
/// );
///
/// dispatcher.dispatch(|| expensive(), |result| match result {
///     Ok(value) => show(value),
///     Err(failure) => report(failure),
/// })?;
///
/// main_loop.run_for(Duration::from_secs(1));
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Arc<dyn Executor>,
    host: Arc<dyn MainThreadHost>,
    capacity: Arc<Semaphore>,
    max_in_flight: usize,
    next_id: AtomicU64,
    metrics: Arc<Metrics>,
}

/// A reserved work slot, released when the work finishes
struct Reservation {
    id: WorkId,
    permit: OwnedSemaphorePermit,
}

impl Dispatcher {
    /// Create a dispatcher holding at most `max_in_flight` unfinished work items
    pub fn new(
        executor: Arc<dyn Executor>,
        host: Arc<dyn MainThreadHost>,
        max_in_flight: usize,
    ) -> Self {
        Self::with_metrics(executor, host, max_in_flight, Arc::new(Metrics::new()))
    }

    /// Create a dispatcher recording into shared metrics
    pub fn with_metrics(
        executor: Arc<dyn Executor>,
        host: Arc<dyn MainThreadHost>,
        max_in_flight: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        let max_in_flight = max_in_flight.clamp(1, Semaphore::MAX_PERMITS);
        tracing::debug!(
            "Dispatcher created: strategy={}, max_in_flight={}",
            executor.name(),
            max_in_flight
        );

        Self {
            inner: Arc::new(Inner {
                executor,
                host,
                capacity: Arc::new(Semaphore::new(max_in_flight)),
                max_in_flight,
                next_id: AtomicU64::new(1),
                metrics,
            }),
        }
    }

    /// Name of the worker strategy behind this dispatcher
    pub fn strategy(&self) -> &'static str {
        self.inner.executor.name()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Number of work items accepted but not yet finished
    pub fn in_flight(&self) -> usize {
        self.inner.max_in_flight - self.inner.capacity.available_permits()
    }

    /// Run `work` off the main thread and deliver its value to `on_complete`
    /// on the main thread
    ///
    /// A panic inside `work` is delivered as [`WorkFailure::Panicked`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::Rejected`] if every work slot is taken or the
    /// dispatcher has been shut down. Nothing is run in that case.
    pub fn dispatch<T, W, C>(&self, work: W, on_complete: C) -> Result<WorkHandle, DispatchError>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(WorkResult<T>) + Send + 'static,
    {
        let reservation = self.reserve()?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Ok(self.launch(reservation, cancel_tx, cancel_rx, move || Ok(work()), on_complete))
    }

    /// Like [`dispatch`](Self::dispatch) for fallible work
    ///
    /// An `Err` returned by `work` is delivered as [`WorkFailure::Errored`].
    pub fn try_dispatch<T, E, W, C>(
        &self,
        work: W,
        on_complete: C,
    ) -> Result<WorkHandle, DispatchError>
    where
        T: Send + 'static,
        E: Into<anyhow::Error>,
        W: FnOnce() -> Result<T, E> + Send + 'static,
        C: FnOnce(WorkResult<T>) + Send + 'static,
    {
        let reservation = self.reserve()?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Ok(self.launch(
            reservation,
            cancel_tx,
            cancel_rx,
            move || work().map_err(|e| WorkFailure::Errored(e.into())),
            on_complete,
        ))
    }

    /// Enqueue `callback` for the main thread
    ///
    /// Returns as soon as the callback is queued.
    pub fn on_main_thread<F>(&self, callback: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.host.post(Box::new(callback))
    }

    /// Run a [`BackgroundTask`] through its lifecycle hooks
    ///
    /// Must be called on the main thread: `on_pre_execute` runs before this
    /// returns. The background body then runs on a worker, each published
    /// progress value reaches `on_progress_update` on the main thread, and
    /// `on_post_execute` runs on the main thread after all of them.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Rejected`] before any hook has run.
    pub fn execute_task<B>(
        &self,
        mut task: B,
        params: B::Params,
    ) -> Result<WorkHandle, DispatchError>
    where
        B: BackgroundTask,
    {
        let reservation = self.reserve()?;

        task.on_pre_execute();
        let background = task.background();
        let task = Arc::new(Mutex::new(task));

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let host = Arc::clone(&self.inner.host);
        let progress_task = Arc::clone(&task);
        let id = reservation.id;
        let context = TaskContext::new(
            move |progress: B::Progress| {
                let task = Arc::clone(&progress_task);
                let posted = host.post(Box::new(move || {
                    task.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .on_progress_update(progress);
                }));
                if let Err(e) = posted {
                    tracing::warn!("Dropping progress update for {}: {}", id, e);
                }
            },
            cancel_rx.clone(),
        );

        Ok(self.launch(
            reservation,
            cancel_tx,
            cancel_rx,
            move || background(params, &context).map_err(WorkFailure::Errored),
            move |result| {
                task.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_post_execute(result);
            },
        ))
    }

    /// Stop accepting work
    ///
    /// Work already dispatched still runs and reports.
    pub fn shutdown(&self) {
        tracing::info!("Dispatcher ({}) shutting down", self.strategy());
        self.inner.capacity.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.capacity.is_closed()
    }

    fn reserve(&self) -> Result<Reservation, DispatchError> {
        match Arc::clone(&self.inner.capacity).try_acquire_owned() {
            Ok(permit) => {
                let id = WorkId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
                self.inner.metrics.record_dispatched();
                Ok(Reservation { id, permit })
            }
            Err(e) => {
                let reason = match e {
                    TryAcquireError::NoPermits => RejectReason::Saturated {
                        capacity: self.inner.max_in_flight,
                    },
                    TryAcquireError::Closed => RejectReason::ShutDown,
                };
                self.inner.metrics.record_rejected();
                tracing::warn!("Rejected work on {} dispatcher: {}", self.strategy(), reason);
                Err(DispatchError::Rejected { reason })
            }
        }
    }

    fn launch<T, W, C>(
        &self,
        reservation: Reservation,
        cancel_tx: watch::Sender<bool>,
        cancel_rx: watch::Receiver<bool>,
        work: W,
        on_complete: C,
    ) -> WorkHandle
    where
        T: Send + 'static,
        W: FnOnce() -> WorkResult<T> + Send + 'static,
        C: FnOnce(WorkResult<T>) + Send + 'static,
    {
        let Reservation { id, permit } = reservation;
        let (state_tx, state_rx) = watch::channel(WorkState::Pending);
        let handle = WorkHandle::new(id, state_rx, Arc::new(cancel_tx));

        let host = Arc::clone(&self.inner.host);
        let metrics = Arc::clone(&self.inner.metrics);

        let job = Job::new(id, move |execution| {
            let outcome = match execution {
                Execution::Run if *cancel_rx.borrow() => {
                    tracing::debug!("{} cancelled before start", id);
                    metrics.record_cancelled();
                    Err(WorkFailure::Cancelled)
                }
                Execution::Run => {
                    state_tx.send_replace(WorkState::Running);
                    tracing::debug!("{} running", id);

                    let started = Instant::now();
                    let outcome = catch_unwind(AssertUnwindSafe(work))
                        .unwrap_or_else(|payload| Err(WorkFailure::from_panic(payload)));
                    metrics.record_work_time(started.elapsed());

                    match &outcome {
                        Ok(_) => metrics.record_completed(),
                        Err(failure) => {
                            tracing::debug!("{} failed: {}", id, failure);
                            metrics.record_failed();
                        }
                    }
                    outcome
                }
                Execution::Abandon => {
                    metrics.record_abandoned();
                    Err(WorkFailure::Abandoned)
                }
            };

            state_tx.send_replace(if outcome.is_ok() {
                WorkState::Completed
            } else {
                WorkState::Failed
            });

            // The slot is free once the work is done, not once the callback has run
            drop(permit);

            if let Err(e) = host.post(Box::new(move || on_complete(outcome))) {
                tracing::error!("Completion for {} could not be delivered: {}", id, e);
            }
        });

        tracing::debug!("{} dispatched to {} executor", id, self.strategy());
        self.inner.executor.execute(job);
        handle
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("strategy", &self.strategy())
            .field("max_in_flight", &self.inner.max_in_flight)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::executor::MockExecutor;
    use crate::dispatch::host::{MainJob, MockMainThreadHost};
    use crate::dispatch::main_loop::MainLoop;
    use std::sync::atomic::Ordering as AtomicOrdering;
    use std::time::Duration;

    /// Holds jobs until the test decides what to do with them
    #[derive(Default)]
    struct HoldingExecutor {
        jobs: Mutex<Vec<Job>>,
    }

    impl HoldingExecutor {
        fn take(&self) -> Vec<Job> {
            std::mem::take(&mut *self.jobs.lock().unwrap())
        }
    }

    impl Executor for HoldingExecutor {
        fn name(&self) -> &'static str {
            "holding"
        }

        fn execute(&self, job: Job) {
            self.jobs.lock().unwrap().push(job);
        }
    }

    fn results_sink<T: Send + 'static>() -> (
        Arc<Mutex<Vec<WorkResult<T>>>>,
        impl Fn() -> Box<dyn FnOnce(WorkResult<T>) + Send>,
    ) {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        let make = move || {
            let sink = Arc::clone(&sink);
            Box::new(move |result: WorkResult<T>| sink.lock().unwrap().push(result))
                as Box<dyn FnOnce(WorkResult<T>) + Send>
        };
        (results, make)
    }

    #[test]
    fn test_saturated_dispatcher_rejects_without_executing() {
        let main_loop = MainLoop::new().unwrap();
        let mut executor = MockExecutor::new();
        executor.expect_name().return_const("mock");
        executor.expect_execute().times(2).returning(|job| {
            // Keep the slot occupied by leaking the job into a parked thread
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                job.run();
            });
        });

        let dispatcher = Dispatcher::new(Arc::new(executor), Arc::new(main_loop.handle()), 2);

        dispatcher.dispatch(|| 1, |_| {}).unwrap();
        dispatcher.dispatch(|| 2, |_| {}).unwrap();
        let third = dispatcher.dispatch(|| 3, |_| {});

        match third {
            Err(DispatchError::Rejected {
                reason: RejectReason::Saturated { capacity },
            }) => assert_eq!(capacity, 2),
            other => panic!("Expected saturation, got: {:?}", other.map(|h| h.id())),
        }
        assert_eq!(dispatcher.in_flight(), 2);
        assert_eq!(dispatcher.metrics().rejected.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_slot_released_when_work_finishes() {
        let mut main_loop = MainLoop::new().unwrap();
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor.clone(), Arc::new(main_loop.handle()), 1);

        dispatcher.dispatch(|| (), |_| {}).unwrap();
        assert!(dispatcher.dispatch(|| (), |_| {}).is_err());

        for job in executor.take() {
            job.run();
        }
        assert_eq!(dispatcher.in_flight(), 0);
        assert!(dispatcher.dispatch(|| (), |_| {}).is_ok());

        main_loop.run_pending();
    }

    #[test]
    fn test_abandoned_job_reports_failure() {
        let mut main_loop = MainLoop::new().unwrap();
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor.clone(), Arc::new(main_loop.handle()), 4);
        let (results, sink) = results_sink::<u32>();

        let handle = dispatcher.dispatch(|| 5, sink()).unwrap();
        drop(executor.take());

        main_loop.run_pending();
        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(WorkFailure::Abandoned)));
        assert_eq!(handle.state(), WorkState::Failed);
        assert_eq!(dispatcher.metrics().abandoned.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn test_cancel_before_start_skips_work() {
        let mut main_loop = MainLoop::new().unwrap();
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor.clone(), Arc::new(main_loop.handle()), 4);
        let (results, sink) = results_sink::<()>();
        let ran = Arc::new(AtomicU64::new(0));

        let ran_clone = Arc::clone(&ran);
        let handle = dispatcher
            .dispatch(
                move || {
                    ran_clone.fetch_add(1, AtomicOrdering::SeqCst);
                },
                sink(),
            )
            .unwrap();
        handle.cancel();

        for job in executor.take() {
            job.run();
        }
        main_loop.run_pending();

        assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
        assert!(results.lock().unwrap()[0].as_ref().unwrap_err().is_cancelled());
        assert_eq!(handle.state(), WorkState::Failed);
    }

    #[test]
    fn test_state_is_terminal_before_callback_runs() {
        let mut main_loop = MainLoop::new().unwrap();
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor.clone(), Arc::new(main_loop.handle()), 4);
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = Arc::clone(&seen);
        let handle = dispatcher.dispatch(|| "done", move |_| {}).unwrap();
        let observer = handle.clone();
        dispatcher
            .on_main_thread(move || *seen_clone.lock().unwrap() = Some(observer.state()))
            .unwrap();

        assert_eq!(handle.state(), WorkState::Pending);
        main_loop.run_pending();
        assert_eq!(*seen.lock().unwrap(), Some(WorkState::Pending));

        for job in executor.take() {
            job.run();
        }
        assert_eq!(handle.state(), WorkState::Completed);
        assert_eq!(main_loop.run_pending(), 1);
    }

    #[test]
    fn test_undeliverable_completion_is_logged_not_panicked() {
        let mut host = MockMainThreadHost::new();
        host.expect_post()
            .times(1)
            .returning(|_job: MainJob| Err(DispatchError::HostUnavailable));
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor.clone(), Arc::new(host), 4);

        let mut handle = dispatcher.dispatch(|| 1, |_| {}).unwrap();
        for job in executor.take() {
            job.run();
        }

        assert_eq!(dispatcher.metrics().completed.load(AtomicOrdering::Relaxed), 1);
        assert_eq!(dispatcher.in_flight(), 0);

        // The work did finish, so the handle is terminal even though nobody
        // will ever see the callback
        assert_eq!(handle.state(), WorkState::Completed);
        let mut waiting = tokio_test::task::spawn(async move { handle.finished().await });
        tokio_test::assert_ready_eq!(waiting.poll(), WorkState::Completed);
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let main_loop = MainLoop::new().unwrap();
        let executor = Arc::new(HoldingExecutor::default());
        let dispatcher = Dispatcher::new(executor, Arc::new(main_loop.handle()), 4);

        dispatcher.shutdown();

        assert!(dispatcher.is_shut_down());
        let result = dispatcher.dispatch(|| (), |_| {});
        assert!(matches!(
            result,
            Err(DispatchError::Rejected {
                reason: RejectReason::ShutDown
            })
        ));
    }
}
