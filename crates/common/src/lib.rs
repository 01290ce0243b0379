//! Common utilities for recovery-sideload
//!
//! This crate provides the pieces shared between the sideload controller and
//! anything that observes it: error handling, logging setup, the install
//! outcome enumeration, and the session-state sink read by the UI layer.

pub mod error;
pub mod logging;
pub mod outcome;
pub mod session;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use outcome::InstallOutcome;
pub use session::{CHILD_PID_KEY, HAS_CANCEL_KEY, SessionSink, SessionValue, SharedSession};
