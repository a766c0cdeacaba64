// UI module - login flow wiring
//
// This module contains:
// - LoginController: runs a login through the chosen approach and updates session state
// - LoginTask: the lifecycle-hook version of the same login

pub mod controller;
pub mod login_task;

pub use controller::LoginController;
pub use login_task::{LoginProgress, LoginTask};
