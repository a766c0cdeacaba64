//! Data models for TinyThreading.
//!
//! - [`Settings`]: dispatch, logging and demo settings loaded from `TinyThreading.yaml`
//! - [`SessionState`]: presentation state of the login demo (progress dialog, alerts, counters)
//! - [`LoginApproach`]: the ways the demo gets its login off the main thread

pub mod config;
pub mod session;

pub use self::config::{
    DemoSettings, DispatchSettings, LoggingSettings, LoginApproach, Settings, SettingsError,
};
pub use session::{Alert, ProgressDialog, SessionState};
