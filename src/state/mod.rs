// State management module
//
// Wraps the login demo's SessionState with thread-safe access and emits
// change events so a presenter can react without polling.

use crate::models::session::{FAILURE_TITLE, SUCCESS_MESSAGE, SUCCESS_TITLE};
use crate::models::{ProgressDialog, SessionState};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when session state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A login has been started
    LoginStarted { user: String },

    /// The progress dialog has appeared
    ProgressShown { title: String, message: String },

    /// The visible progress dialog changed its message
    ProgressMessageChanged { message: String },

    /// The progress dialog has been dismissed
    ProgressHidden,

    /// An alert has been shown
    AlertShown { title: String, message: String },

    /// A login has reported back
    LoginFinished { succeeded: bool },

    /// State has been reset
    StateReset,
}

/// Thread-safe session state with event emission
///
/// This replaces the implicit globals of a typical activity (a shared
/// progress dialog, a shared service) with one owned object that is passed
/// explicitly to whoever needs it.
///
/// # Usage
///
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for reading
/// - [`update()`](Self::update) or the convenience methods for mutations,
///   which emit [`StateChange`] events
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// Mutations are expected on the main thread only; the lock exists so that
/// workers and tests can read safely.
pub struct StateManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let busy = state_manager.read(|state| state.is_progress_visible());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Work out which events describe the difference between two states
    fn detect_changes(old: &SessionState, new: &SessionState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if new.logins_started > old.logins_started {
            changes.push(StateChange::LoginStarted {
                user: new.last_user.clone().unwrap_or_default(),
            });
        }

        match (&old.progress, &new.progress) {
            (None, Some(dialog)) => changes.push(StateChange::ProgressShown {
                title: dialog.title.clone(),
                message: dialog.message.clone(),
            }),
            (Some(before), Some(after)) if before.message != after.message => {
                changes.push(StateChange::ProgressMessageChanged {
                    message: after.message.clone(),
                })
            }
            (Some(_), None) => changes.push(StateChange::ProgressHidden),
            _ => {}
        }

        if new.alerts.len() > old.alerts.len() {
            for alert in &new.alerts[old.alerts.len()..] {
                changes.push(StateChange::AlertShown {
                    title: alert.title.clone(),
                    message: alert.message.clone(),
                });
            }
        }

        if new.logins_succeeded > old.logins_succeeded {
            changes.push(StateChange::LoginFinished { succeeded: true });
        }
        if new.logins_failed > old.logins_failed {
            changes.push(StateChange::LoginFinished { succeeded: false });
        }

        changes
    }

    // Convenience methods for the login flow

    /// Record a new login and show the progress dialog
    pub fn begin_login(&self, user: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.logins_started += 1;
            state.last_user = Some(user.to_string());
            state.show_progress(ProgressDialog::login());
        })
    }

    /// Change the message of the visible progress dialog
    pub fn set_progress_message(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| state.set_progress_message(message))
    }

    /// Hide the progress dialog and show the success alert
    pub fn login_succeeded(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.hide_progress();
            state.show_alert(SUCCESS_TITLE, SUCCESS_MESSAGE);
            state.logins_succeeded += 1;
        })
    }

    /// Hide the progress dialog and show a failure alert
    pub fn login_failed(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| {
            state.hide_progress();
            state.show_alert(FAILURE_TITLE, message);
            state.logins_failed += 1;
        })
    }

    /// Reset the session state
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.reset());

        let reset_event = StateChange::StateReset;
        let _ = self.state_tx.send(reset_event.clone());
        changes.push(reset_event);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across callbacks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
