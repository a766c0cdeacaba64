use crate::dispatch::{Background, BackgroundTask, TaskContext, WorkResult};
use crate::services::{LoginReceipt, LoginService};
use crate::state::StateManager;
use std::sync::Arc;

/// Progress published by the background half of a [`LoginTask`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginProgress {
    Authenticating(String),
}

/// Login as a lifecycle task
///
/// The dialog work happens in the hooks, on the main thread. Only the
/// service call runs on a worker, and it sees nothing but the service and
/// the user name it was handed.
pub struct LoginTask {
    service: Arc<LoginService>,
    state: StateManager,
    user: String,
}

impl LoginTask {
    pub fn new(service: Arc<LoginService>, state: StateManager, user: impl Into<String>) -> Self {
        Self {
            service,
            state,
            user: user.into(),
        }
    }
}

impl BackgroundTask for LoginTask {
    type Params = String;
    type Progress = LoginProgress;
    type Output = LoginReceipt;

    fn on_pre_execute(&mut self) {
        self.state.begin_login(&self.user);
    }

    fn background(&mut self) -> Background<String, LoginProgress, LoginReceipt> {
        let service = Arc::clone(&self.service);
        Box::new(move |user: String, ctx: &TaskContext<LoginProgress>| {
            if ctx.is_cancelled() {
                anyhow::bail!("Login for {} cancelled", user);
            }
            ctx.publish_progress(LoginProgress::Authenticating(user.clone()));
            Ok(service.login(&user))
        })
    }

    fn on_progress_update(&mut self, progress: LoginProgress) {
        match progress {
            LoginProgress::Authenticating(user) => {
                self.state.set_progress_message(format!("Authenticating {}...", user));
            }
        }
    }

    fn on_post_execute(&mut self, result: WorkResult<LoginReceipt>) {
        match result {
            Ok(receipt) => {
                tracing::debug!("Lifecycle login for {} took {:?}", receipt.user, receipt.elapsed);
                self.state.login_succeeded();
            }
            Err(failure) => {
                tracing::warn!("Lifecycle login for {} failed: {}", self.user, failure);
                self.state.login_failed(failure.to_string());
            }
        }
    }
}
