// TinyThreading - Run blocking work off the main thread and deliver its
// result back to the main thread
//
// This is the library crate containing the dispatch primitive and the login
// demo built on it. The binary crate (main.rs) runs the demo headless.

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use crate::config::ConfigManager;
pub use dispatch::{
    DispatchError, Dispatcher, MainLoop, MainThreadHost, Strategy, WorkFailure, WorkHandle,
    WorkResult, WorkState, WorkerRuntime,
};
pub use metrics::Metrics;
pub use models::{LoginApproach, Settings};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
