/// Title of the progress dialog shown while a login runs
pub const PROGRESS_TITLE: &str = "Login In Progress";

/// Message of the progress dialog shown while a login runs
pub const PROGRESS_MESSAGE: &str = "Please wait...";

/// Alert shown after a successful login
pub const SUCCESS_TITLE: &str = "Login Successful";
pub const SUCCESS_MESSAGE: &str = "Great success!";

/// Alert title shown when the login work failed
pub const FAILURE_TITLE: &str = "Login Failed";

/// An indeterminate progress dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDialog {
    pub title: String,
    pub message: String,
}

impl ProgressDialog {
    pub fn login() -> Self {
        Self {
            title: PROGRESS_TITLE.to_string(),
            message: PROGRESS_MESSAGE.to_string(),
        }
    }
}

/// A dismissable alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

/// Presentation state of the login demo
///
/// Owned by [`crate::state::StateManager`] and only ever mutated from the
/// main thread: either directly by the controller or from completion
/// callbacks the dispatcher delivers there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Progress dialog currently on screen
    pub progress: Option<ProgressDialog>,

    /// Every alert shown, oldest first
    pub alerts: Vec<Alert>,

    /// User of the most recent login
    pub last_user: Option<String>,

    pub logins_started: usize,
    pub logins_succeeded: usize,
    pub logins_failed: usize,
}

impl SessionState {
    pub fn is_progress_visible(&self) -> bool {
        self.progress.is_some()
    }

    /// Logins that have reported back, successfully or not
    pub fn logins_finished(&self) -> usize {
        self.logins_succeeded + self.logins_failed
    }

    /// Logins started but not yet reported back
    pub fn logins_outstanding(&self) -> usize {
        self.logins_started.saturating_sub(self.logins_finished())
    }

    pub fn last_alert(&self) -> Option<&Alert> {
        self.alerts.last()
    }

    pub fn show_progress(&mut self, dialog: ProgressDialog) {
        self.progress = Some(dialog);
    }

    /// Replace the message of the visible progress dialog, if any
    pub fn set_progress_message(&mut self, message: impl Into<String>) {
        if let Some(dialog) = self.progress.as_mut() {
            dialog.message = message.into();
        }
    }

    pub fn hide_progress(&mut self) {
        self.progress = None;
    }

    pub fn show_alert(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.alerts.push(Alert {
            title: title.into(),
            message: message.into(),
        });
    }

    /// Return to the initial state between demo runs
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert!(!state.is_progress_visible());
        assert!(state.last_alert().is_none());
        assert_eq!(state.logins_finished(), 0);
    }

    #[test]
    fn test_progress_dialog_lifecycle() {
        let mut state = SessionState::default();

        state.show_progress(ProgressDialog::login());
        assert_eq!(state.progress.as_ref().unwrap().title, PROGRESS_TITLE);

        state.set_progress_message("Authenticating greg...");
        assert_eq!(state.progress.as_ref().unwrap().message, "Authenticating greg...");

        state.hide_progress();
        assert!(!state.is_progress_visible());

        // Without a dialog the message has nowhere to go
        state.set_progress_message("ignored");
        assert!(state.progress.is_none());
    }

    #[test]
    fn test_outstanding_logins() {
        let mut state = SessionState::default();
        state.logins_started = 3;
        state.logins_succeeded = 1;
        state.logins_failed = 1;

        assert_eq!(state.logins_finished(), 2);
        assert_eq!(state.logins_outstanding(), 1);
    }

    #[test]
    fn test_alerts_keep_order() {
        let mut state = SessionState::default();
        state.show_alert(SUCCESS_TITLE, SUCCESS_MESSAGE);
        state.show_alert(FAILURE_TITLE, "boom");

        assert_eq!(state.alerts.len(), 2);
        assert_eq!(state.last_alert().unwrap().message, "boom");

        state.reset();
        assert!(state.alerts.is_empty());
    }
}
