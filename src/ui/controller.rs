// Login Controller - Coordinates the login flow with the main thread
//
// This module contains the LoginController which wires together:
// - LoginService (blocking work)
// - StateManager (dialogs and alerts)
// - Dispatcher (getting work off the main thread and results back onto it)
//
// Each LoginApproach shows a different way of running the same login. Only
// the synchronous one blocks the main thread.

use crate::dispatch::{Dispatcher, WorkHandle};
use crate::models::{LoginApproach, SessionState};
use crate::services::LoginService;
use crate::state::StateManager;
use crate::ui::login_task::LoginTask;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Controller for the login screen
///
/// All methods must be called on the main thread. State mutations happen
/// either inline (synchronous approach, pre-execute hook) or in callbacks the
/// dispatcher delivers to the main thread.
///
/// # Example
/// ```ignore
/// let controller = LoginController::new(dispatcher, Arc::new(LoginService::default()), state);
/// controller.login(LoginApproach::Dispatched, "greg")?;
/// main_loop.run_until(|| controller.state().read(|s| s.logins_outstanding() == 0), timeout)?;
/// ```
#[derive(Clone)]
pub struct LoginController {
    /// Where login work runs and where its results come back
    dispatcher: Dispatcher,

    /// The blocking login call
    service: Arc<LoginService>,

    /// Shared presentation state
    state: StateManager,
}

impl LoginController {
    pub fn new(dispatcher: Dispatcher, service: Arc<LoginService>, state: StateManager) -> Self {
        Self {
            dispatcher,
            service,
            state,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start a login for `user`
    ///
    /// # Returns
    /// A handle to the background work, or `None` for the synchronous
    /// approach, which has finished by the time this returns.
    ///
    /// # Errors
    /// The dispatcher refused the work. For the dispatched approach the
    /// failure is also shown as an alert, since the progress dialog is
    /// already up by then.
    pub fn login(&self, approach: LoginApproach, user: &str) -> Result<Option<WorkHandle>> {
        tracing::info!(
            "Login for {} via {} on {} dispatcher",
            user,
            approach,
            self.dispatcher.strategy()
        );

        match approach {
            LoginApproach::Synchronous => {
                self.login_synchronous(user);
                Ok(None)
            }
            LoginApproach::Dispatched => self.login_dispatched(user).map(Some),
            LoginApproach::LifecycleTask => self.login_with_task(user).map(Some),
        }
    }

    /// Log in on the calling thread
    ///
    /// The progress dialog is set before the call and cleared after it, with
    /// nothing pumping the main loop in between, so it is never seen.
    fn login_synchronous(&self, user: &str) {
        self.state.begin_login(user);
        let receipt = self.service.login(user);
        tracing::warn!(
            "Main thread was blocked for {:?} by a synchronous login",
            receipt.elapsed
        );
        self.state.login_succeeded();
    }

    fn login_dispatched(&self, user: &str) -> Result<WorkHandle> {
        self.state.begin_login(user);

        let service = Arc::clone(&self.service);
        let state = self.state.clone();
        let name = user.to_string();
        let dispatched = self.dispatcher.dispatch(
            move || service.login(&name),
            move |result| match result {
                Ok(receipt) => {
                    tracing::debug!("Dispatched login for {} completed", receipt.user);
                    state.login_succeeded();
                }
                Err(failure) => {
                    tracing::warn!("Dispatched login failed: {}", failure);
                    state.login_failed(failure.to_string());
                }
            },
        );

        match dispatched {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.state.login_failed(e.to_string());
                Err(e).with_context(|| format!("Failed to dispatch login for {}", user))
            }
        }
    }

    fn login_with_task(&self, user: &str) -> Result<WorkHandle> {
        let task = LoginTask::new(Arc::clone(&self.service), self.state.clone(), user);
        self.dispatcher
            .execute_task(task, user.to_string())
            .with_context(|| format!("Failed to start login task for {}", user))
    }

    /// Close the screen's session and start a fresh one
    ///
    /// Returns the state as it was just before the reset. Logins still
    /// outstanding will report into the new session.
    pub fn end_session(&self) -> SessionState {
        let finished = self.state.snapshot();
        if finished.logins_outstanding() > 0 {
            tracing::warn!(
                "Ending session with {} logins outstanding",
                finished.logins_outstanding()
            );
        }
        self.state.reset();
        finished
    }
}
