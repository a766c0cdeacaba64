// Dispatch metrics
//
// Lightweight counters for work items and main-thread callbacks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Dispatch and delivery metrics
///
/// Uses atomic operations so workers and the main thread can record without
/// locks. One instance is usually shared by the dispatchers and the main loop
/// of an application and logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Work items accepted by a dispatcher
    pub dispatched: AtomicU64,

    /// Dispatches refused synchronously
    pub rejected: AtomicU64,

    /// Work items that returned a value
    pub completed: AtomicU64,

    /// Work items that panicked or returned an error
    pub failed: AtomicU64,

    /// Work items skipped because cancellation was requested
    pub cancelled: AtomicU64,

    /// Work items dropped by their executor without running
    pub abandoned: AtomicU64,

    /// Total time spent inside work bodies in milliseconds
    pub total_work_time_ms: AtomicU64,

    /// Callbacks enqueued for the main thread
    pub callbacks_posted: AtomicU64,

    /// Callbacks run by the main thread
    pub callbacks_run: AtomicU64,

    /// Callbacks that could not be posted because the host was gone
    pub callbacks_undeliverable: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            total_work_time_ms: AtomicU64::new(0),
            callbacks_posted: AtomicU64::new(0),
            callbacks_run: AtomicU64::new(0),
            callbacks_undeliverable: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent inside one work body
    pub fn record_work_time(&self, duration: Duration) {
        self.total_work_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_callback_posted(&self) {
        self.callbacks_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_run(&self) {
        self.callbacks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_undeliverable(&self) {
        self.callbacks_undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    /// Callbacks posted but not yet run by the main thread
    pub fn pending_callbacks(&self) -> u64 {
        let posted = self.callbacks_posted.load(Ordering::Relaxed);
        let run = self.callbacks_run.load(Ordering::Relaxed);
        posted.saturating_sub(run)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per finished work body in milliseconds
    pub fn avg_work_time_ms(&self) -> f64 {
        let total = self.total_work_time_ms.load(Ordering::Relaxed);
        let count =
            self.completed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Dispatch Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Work: {} dispatched, {} rejected, {} completed, {} failed, {} cancelled, {} abandoned",
            self.dispatched.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
            self.completed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.cancelled.load(Ordering::Relaxed),
            self.abandoned.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total work time: {:.2}s (avg: {:.2}ms per item)",
            self.total_work_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_work_time_ms()
        );
        tracing::info!(
            "Callbacks: {} posted, {} run, {} pending, {} undeliverable",
            self.callbacks_posted.load(Ordering::Relaxed),
            self.callbacks_run.load(Ordering::Relaxed),
            self.pending_callbacks(),
            self.callbacks_undeliverable.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.dispatched.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.pending_callbacks(), 0);
    }

    #[test]
    fn test_record_outcomes() {
        let metrics = Metrics::new();

        metrics.record_dispatched();
        metrics.record_dispatched();
        metrics.record_completed();
        metrics.record_failed();
        metrics.record_rejected();

        assert_eq!(metrics.dispatched.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rejected.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_avg_work_time() {
        let metrics = Metrics::new();

        metrics.record_completed();
        metrics.record_work_time(Duration::from_millis(100));
        metrics.record_failed();
        metrics.record_work_time(Duration::from_millis(200));

        assert_eq!(metrics.total_work_time_ms.load(Ordering::Relaxed), 300);
        assert_eq!(metrics.avg_work_time_ms(), 150.0);
    }

    #[test]
    fn test_avg_work_time_no_items() {
        assert_eq!(Metrics::new().avg_work_time_ms(), 0.0);
    }

    #[test]
    fn test_pending_callbacks() {
        let metrics = Metrics::new();

        metrics.record_callback_posted();
        metrics.record_callback_posted();
        metrics.record_callback_run();

        assert_eq!(metrics.pending_callbacks(), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
