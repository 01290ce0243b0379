//! USB gadget driver control
//!
//! The gadget driver is toggled by writing a single byte to a sysfs node:
//! `1` enables peripheral mode, `0` disables it. Older kernels do not expose
//! the node at all, so every failure here is reported to the caller and
//! logged, never treated as fatal.
//!
//! Each toggle is a scoped open -> write -> close with no handle kept in
//! between. The receive window is modelled by [`UsbWindow`], which disables
//! the driver when it goes out of scope.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to open driver control {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set driver control {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to close driver control {path}: {source}")]
    Close {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Anything that can switch the USB gadget driver on or off
pub trait DriverControl: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<(), DriverError>;
}

/// Driver control backed by a sysfs node
#[derive(Debug, Clone)]
pub struct SysfsDriver {
    path: PathBuf,
}

impl SysfsDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DriverControl for SysfsDriver {
    fn set_enabled(&self, enabled: bool) -> Result<(), DriverError> {
        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| DriverError::Open {
                path: self.path.clone(),
                source,
            })?;

        let payload: &[u8] = if enabled { b"1" } else { b"0" };
        let written = file.write_all(payload).map_err(|source| DriverError::Write {
            path: self.path.clone(),
            source,
        });

        // Close is attempted even after a failed write
        let closed = close(file).map_err(|source| DriverError::Close {
            path: self.path.clone(),
            source,
        });

        match (written, closed) {
            (Err(write_err), Err(close_err)) => {
                warn!("{}", close_err);
                Err(write_err)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                debug!("USB driver {}", if enabled { "enabled" } else { "disabled" });
                Ok(())
            }
        }
    }
}

#[cfg(unix)]
fn close(file: File) -> std::io::Result<()> {
    use std::os::unix::io::IntoRawFd;

    nix::unistd::close(file.into_raw_fd()).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn close(file: File) -> std::io::Result<()> {
    drop(file);
    Ok(())
}

/// Set the driver state, logging instead of failing
///
/// Returns whether the write went through.
pub fn set_usb_driver(driver: &dyn DriverControl, enabled: bool) -> bool {
    match driver.set_enabled(enabled) {
        Ok(()) => true,
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

/// Enabled driver for the duration of a receive window
///
/// Dropping the window disables the driver, so the node is switched off on
/// every exit path, including a cancelled or panicking session.
pub struct UsbWindow<'a> {
    driver: &'a dyn DriverControl,
    closed: bool,
}

impl<'a> UsbWindow<'a> {
    /// Enable the driver and open the window
    pub fn open(driver: &'a dyn DriverControl) -> Self {
        set_usb_driver(driver, true);
        Self {
            driver,
            closed: false,
        }
    }

    /// Disable the driver now
    pub fn close(mut self) {
        self.disable();
    }

    fn disable(&mut self) {
        if !self.closed {
            self.closed = true;
            set_usb_driver(self.driver, false);
        }
    }
}

impl Drop for UsbWindow<'_> {
    fn drop(&mut self) {
        self.disable();
    }
}
