// Headless main-thread event loop
//
// Stands in for the GUI toolkit's UI thread: callbacks posted from any thread
// are queued and run, one at a time and in posting order, whenever the owning
// thread pumps the loop.

use crate::dispatch::error::DispatchError;
use crate::dispatch::host::{MainJob, MainThreadHost};
use crate::metrics::Metrics;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The main thread's callback queue and the means to drain it
///
/// A `MainLoop` belongs to the thread that created it and cannot be sent
/// elsewhere. Work reaches it only through [`MainLoopHandle`]s.
///
/// The pumping methods block on a private current-thread runtime, so they
/// must not be called from inside an async context.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<MainJob>,
    handle: MainLoopHandle,
    waiter: tokio::runtime::Runtime,
    _not_send: PhantomData<Rc<()>>,
}

impl MainLoop {
    /// Create a main loop owned by the current thread
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_metrics(Arc::new(Metrics::new()))
    }

    /// Create a main loop that records callback counts into shared metrics
    pub fn with_metrics(metrics: Arc<Metrics>) -> Result<Self, DispatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let waiter = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let handle = MainLoopHandle {
            tx,
            owner: thread::current().id(),
            metrics,
        };

        tracing::debug!("Main loop created on {:?}", handle.owner);

        Ok(Self {
            rx,
            handle,
            waiter,
            _not_send: PhantomData,
        })
    }

    /// A cloneable handle for posting callbacks from any thread
    pub fn handle(&self) -> MainLoopHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.handle.metrics
    }

    /// Run every callback that is queued right now, including ones queued by
    /// those callbacks, and return how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.run_job(job);
            ran += 1;
        }
        ran
    }

    /// Run callbacks as they arrive until `duration` has elapsed
    ///
    /// Returns at the deadline even if callbacks are still queued; they run
    /// on the next pump.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut ran = 0;
        while Instant::now() < deadline {
            match self.next_before(deadline) {
                Some(job) => {
                    self.run_job(job);
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Run callbacks until `done` returns true
    ///
    /// `done` is checked before waiting and after every callback. The
    /// deadline holds even while callbacks keep arriving.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Timeout`] if `done` still returns false after `timeout`.
    pub fn run_until<F>(&mut self, mut done: F, timeout: Duration) -> Result<usize, DispatchError>
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        while !done() {
            if Instant::now() >= deadline {
                return Err(DispatchError::Timeout(timeout));
            }
            match self.next_before(deadline) {
                Some(job) => {
                    self.run_job(job);
                    ran += 1;
                }
                None => return Err(DispatchError::Timeout(timeout)),
            }
        }
        Ok(ran)
    }

    pub fn is_main_thread(&self) -> bool {
        self.handle.is_main_thread()
    }

    fn run_job(&self, job: MainJob) {
        job();
        self.handle.metrics.record_callback_run();
    }

    /// Wait for the next callback, giving up at `deadline`
    fn next_before(&mut self, deadline: Instant) -> Option<MainJob> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Self { rx, waiter, .. } = self;
        waiter
            .block_on(async { tokio::time::timeout(remaining, rx.recv()).await })
            .ok()
            .flatten()
    }
}

/// Posting side of a [`MainLoop`]
///
/// Posting never blocks: the queue is unbounded so that a slow main thread
/// can delay callbacks but never lose them.
#[derive(Debug, Clone)]
pub struct MainLoopHandle {
    tx: mpsc::UnboundedSender<MainJob>,
    owner: ThreadId,
    metrics: Arc<Metrics>,
}

impl MainLoopHandle {
    /// True when called on the thread that owns the main loop
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn main_thread_id(&self) -> ThreadId {
        self.owner
    }

    /// Post a closure without boxing it first
    pub fn invoke<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(Box::new(f))
    }
}

impl MainThreadHost for MainLoopHandle {
    fn post(&self, job: MainJob) -> Result<(), DispatchError> {
        match self.tx.send(job) {
            Ok(()) => {
                self.metrics.record_callback_posted();
                Ok(())
            }
            Err(_) => {
                self.metrics.record_callback_undeliverable();
                Err(DispatchError::HostUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_run_pending_preserves_post_order() {
        let mut main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            handle.invoke(move || seen.lock().unwrap().push(i)).unwrap();
        }

        assert_eq!(main_loop.run_pending(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(main_loop.metrics().pending_callbacks(), 0);
    }

    #[test]
    fn test_callbacks_run_on_owner_thread() {
        let mut main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        let observed = Arc::new(Mutex::new(None));

        let worker_handle = handle.clone();
        let observed_clone = Arc::clone(&observed);
        thread::spawn(move || {
            assert!(!worker_handle.is_main_thread());
            let check = worker_handle.clone();
            worker_handle
                .invoke(move || *observed_clone.lock().unwrap() = Some(check.is_main_thread()))
                .unwrap();
        })
        .join()
        .unwrap();

        main_loop.run_pending();
        assert_eq!(*observed.lock().unwrap(), Some(true));
        assert!(main_loop.is_main_thread());
    }

    #[test]
    fn test_run_until_wakes_on_post() {
        let mut main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        let done = Arc::new(Mutex::new(false));

        let done_clone = Arc::clone(&done);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.invoke(move || *done_clone.lock().unwrap() = true).unwrap();
        });

        let ran = main_loop
            .run_until(|| *done.lock().unwrap(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(ran, 1);
    }

    #[test]
    fn test_run_until_times_out() {
        let mut main_loop = MainLoop::new().unwrap();
        let result = main_loop.run_until(|| false, Duration::from_millis(20));

        assert!(matches!(result, Err(DispatchError::Timeout(_))));
    }

    #[test]
    fn test_run_for_returns_after_duration() {
        let mut main_loop = MainLoop::new().unwrap();
        let start = Instant::now();

        assert_eq!(main_loop.run_for(Duration::from_millis(30)), 0);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_post_after_drop_is_unavailable() {
        let main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        drop(main_loop);

        let result = handle.invoke(|| {});
        assert!(matches!(result, Err(DispatchError::HostUnavailable)));
        let undeliverable = handle
            .metrics
            .callbacks_undeliverable
            .load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(undeliverable, 1);
    }

    // Each run posts itself again, so the queue is never empty
    fn post_forever(handle: MainLoopHandle) {
        let next = handle.clone();
        handle.invoke(move || post_forever(next)).unwrap();
    }

    #[test]
    fn test_run_for_stops_at_deadline_under_constant_traffic() {
        let mut main_loop = MainLoop::new().unwrap();
        post_forever(main_loop.handle());

        let start = Instant::now();
        let ran = main_loop.run_for(Duration::from_millis(20));

        assert!(ran > 0);
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "run_for overran its deadline: {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn test_run_until_times_out_under_constant_traffic() {
        let mut main_loop = MainLoop::new().unwrap();
        post_forever(main_loop.handle());

        let start = Instant::now();
        let result = main_loop.run_until(|| false, Duration::from_millis(20));

        assert!(matches!(result, Err(DispatchError::Timeout(_))));
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "run_until overran its timeout: {:?}",
            start.elapsed()
        );
    }
}
