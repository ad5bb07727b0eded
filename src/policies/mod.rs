//! Shutdown policies.
//!
//! This module groups the knobs that control **which** termination requests
//! are honored and **how** the controller winds down after one arrives.
//!
//! ## Contents
//! - [`SignalKind`] a termination signal (INT / TERM / HUP / QUIT)
//! - [`ShutdownPolicy`] tracked signals + graceful flag + graceful window
//!
//! ## Defaults
//! - `ShutdownPolicy::default()` → all four signals, graceful, 5s window.

mod shutdown;
mod signal;

pub use shutdown::{DEFAULT_SIGNALS, DEFAULT_TIMEOUT, ShutdownPolicy};
pub use signal::{ParseSignalError, SignalKind};
