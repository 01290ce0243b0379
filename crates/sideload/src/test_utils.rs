//! Test doubles for the sideload collaborators
//!
//! Each double records what the controller asked of it so tests can assert
//! on the exact sequence of side effects.
//!
//! # Example
//!
//! ```
//! use sideload::driver::DriverControl;
//! use sideload::test_utils::RecordingDriver;
//!
//! let driver = RecordingDriver::new();
//! driver.set_enabled(true).unwrap();
//! driver.set_enabled(false).unwrap();
//! assert_eq!(driver.writes(), vec![true, false]);
//! assert_eq!(driver.state(), Some(false));
//! ```

use async_trait::async_trait;
use common::{Error, InstallOutcome, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::driver::{DriverControl, DriverError};
use crate::installer::PackageInstaller;
use crate::operator::Operator;
use crate::property::PropertyService;

/// Driver double recording every requested state
#[derive(Debug, Default)]
pub struct RecordingDriver {
    writes: Mutex<Vec<bool>>,
    state: Mutex<Option<bool>>,
    failure: Option<DriverFailure>,
}

/// Phase at which a [`RecordingDriver`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFailure {
    Open,
    Write,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver whose node cannot be opened, like platforms without it
    pub fn failing() -> Self {
        Self::failing_at(DriverFailure::Open)
    }

    /// Driver whose node opens but rejects every write
    pub fn failing_writes() -> Self {
        Self::failing_at(DriverFailure::Write)
    }

    fn failing_at(failure: DriverFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// Every requested state, in order, including failed attempts
    pub fn writes(&self) -> Vec<bool> {
        self.writes.lock().unwrap().clone()
    }

    /// Last state that was actually written
    pub fn state(&self) -> Option<bool> {
        *self.state.lock().unwrap()
    }
}

impl DriverControl for RecordingDriver {
    fn set_enabled(&self, enabled: bool) -> std::result::Result<(), DriverError> {
        self.writes.lock().unwrap().push(enabled);
        let path = PathBuf::from("/sys/class/android_usb/android0/enable");
        match self.failure {
            Some(DriverFailure::Open) => {
                return Err(DriverError::Open {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Some(DriverFailure::Write) => {
                return Err(DriverError::Write {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            None => {}
        }
        *self.state.lock().unwrap() = Some(enabled);
        Ok(())
    }
}

/// In-memory property service
#[derive(Debug, Default)]
pub struct FakeProperties {
    values: Mutex<HashMap<String, String>>,
    sets: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl FakeProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Property service where every call fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Every `set` call, in order
    pub fn sets(&self) -> Vec<(String, String)> {
        self.sets.lock().unwrap().clone()
    }

    /// Values passed to `set` for `key`
    pub fn sets_for(&self, key: &str) -> Vec<String> {
        self.sets()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }
}

#[async_trait]
impl PropertyService for FakeProperties {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.sets
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        if self.failing {
            return Err(Error::Property("property service unavailable".to_string()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.failing {
            return Err(Error::Property("property service unavailable".to_string()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }
}

/// Installer double returning a fixed outcome
#[derive(Debug)]
pub struct FakeInstaller {
    outcome: InstallOutcome,
    wipe_cache: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeInstaller {
    pub fn new(outcome: InstallOutcome) -> Self {
        Self {
            outcome,
            wipe_cache: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Also request a cache wipe on every install
    pub fn requesting_wipe(mut self) -> Self {
        self.wipe_cache = true;
        self
    }

    /// Paths passed to `install`, in order
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn install(&self, path: &Path, wipe_cache: &mut bool) -> InstallOutcome {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.wipe_cache {
            *wipe_cache = true;
        }
        self.outcome
    }
}

/// Operator double capturing printed messages
#[derive(Debug, Default)]
pub struct RecordingOperator {
    messages: Mutex<Vec<String>>,
}

impl RecordingOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Whether any message contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl Operator for RecordingOperator {
    fn print(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
