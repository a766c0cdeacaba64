//! Services module - the work the demo moves off the main thread.
//!
//! - [`LoginService`]: a stand-in for a slow, blocking login call. It sleeps
//!   for a configured delay and reports success; there is no network or
//!   credential check behind it.
//!
//! Services know nothing about threads or the main loop. They block, and it
//! is the caller's job (see [`crate::ui::LoginController`]) to make sure that
//! happens somewhere other than the main thread.

pub mod login;

pub use login::{LoginReceipt, LoginService};
