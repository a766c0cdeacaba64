// Slint event loop as the main-thread host
//
// Completions are queued with `slint::invoke_from_event_loop`, which runs
// them on Slint's UI thread in posting order and wakes the loop if it is idle.

use crate::dispatch::error::DispatchError;
use crate::dispatch::host::{MainJob, MainThreadHost};

/// Posts callbacks onto the running Slint event loop
///
/// # Example
/// ```ignore
/// let ui = MainWindow::new()?;
/// let dispatcher = Dispatcher::new(runtime.executor(Strategy::Task), Arc::new(SlintHost), 16);
///
/// let ui_weak = ui.as_weak();
/// ui.on_login(move || {
///     let ui_weak = ui_weak.clone();
///     let _ = dispatcher.dispatch(|| service.login("greg"), move |result| {
///         if let Some(ui) = ui_weak.upgrade() {
///             ui.set_logged_in(result.is_ok());
///         }
///     });
/// });
/// ui.run()?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SlintHost;

impl MainThreadHost for SlintHost {
    fn post(&self, job: MainJob) -> Result<(), DispatchError> {
        slint::invoke_from_event_loop(job).map_err(|e| {
            tracing::warn!("Failed to queue callback to Slint event loop: {:?}", e);
            DispatchError::HostUnavailable
        })
    }
}
