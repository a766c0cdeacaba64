use crate::dispatch::Strategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Settings loaded from TinyThreading.yaml and `TINYTHREADING_` environment variables
///
/// Every field has a default, so a partial file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub dispatch: DispatchSettings,
    pub logging: LoggingSettings,
    pub demo: DemoSettings,
}

/// Worker execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Strategy used when none is given explicitly
    pub strategy: Strategy,

    /// Async worker threads of the worker runtime
    pub worker_threads: usize,

    /// Work items a dispatcher holds before rejecting more
    pub max_in_flight: usize,

    /// Prefix for worker thread names
    pub thread_name: String,

    /// How long the main loop waits for outstanding callbacks
    pub callback_timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Task,
            worker_threads: 4,
            max_in_flight: 64,
            thread_name: "tinythreading-worker".to_string(),
            callback_timeout_secs: 30,
        }
    }
}

impl DispatchSettings {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_dir: String,
    pub log_prefix: String,
    pub debug_mode: bool,
    pub console_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_prefix: "tinythreading".to_string(),
            debug_mode: false,
            console_output: true,
        }
    }
}

/// How the login demo gets its work off the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginApproach {
    /// Login on the main thread; the progress dialog never gets a chance to show
    Synchronous,
    /// Plain dispatch with a completion callback
    Dispatched,
    /// Lifecycle task with pre-execute, progress and post-execute hooks
    LifecycleTask,
}

impl LoginApproach {
    pub const ALL: [LoginApproach; 3] = [
        LoginApproach::Synchronous,
        LoginApproach::Dispatched,
        LoginApproach::LifecycleTask,
    ];
}

impl fmt::Display for LoginApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginApproach::Synchronous => "synchronous",
            LoginApproach::Dispatched => "dispatched",
            LoginApproach::LifecycleTask => "lifecycle_task",
        };
        f.write_str(name)
    }
}

/// What the demo binary runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub user: String,
    pub login_delay_ms: u64,
    pub strategies: Vec<Strategy>,
    pub approaches: Vec<LoginApproach>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            user: "greg".to_string(),
            login_delay_ms: 1500,
            strategies: Strategy::ALL.to_vec(),
            approaches: LoginApproach::ALL.to_vec(),
        }
    }
}

impl DemoSettings {
    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }
}

/// Settings values that would leave the dispatcher or demo unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl Settings {
    /// Check values that would make the dispatcher or demo unusable
    ///
    /// # Returns
    /// The first problem found
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.dispatch.max_in_flight == 0 {
            return Err(SettingsError::Zero("dispatch.max_in_flight"));
        }
        if self.dispatch.worker_threads == 0 {
            return Err(SettingsError::Zero("dispatch.worker_threads"));
        }
        if self.demo.strategies.is_empty() {
            return Err(SettingsError::Empty("demo.strategies"));
        }
        if self.demo.approaches.is_empty() {
            return Err(SettingsError::Empty("demo.approaches"));
        }
        Ok(())
    }
}
