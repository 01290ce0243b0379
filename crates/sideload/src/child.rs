//! Sideload helper process
//!
//! The helper is the recovery binary re-executed in its adb daemon mode. It
//! receives the package from the host and writes it to the install path,
//! then exits.

use common::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ChildSettings;

/// How the helper ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exited on its own, with `code` when it exited normally
    Exited { code: Option<i32>, signal: Option<i32> },
    /// Never started
    SpawnFailed,
    /// Killed after a cancel request
    Cancelled,
}

impl ChildExit {
    fn from_status(status: ExitStatus) -> Self {
        ChildExit::Exited {
            code: status.code(),
            signal: exit_signal(&status),
        }
    }

    /// Normal exit with status 0
    pub fn is_success(&self) -> bool {
        matches!(self, ChildExit::Exited { code: Some(0), .. })
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Exited {
                code: Some(code), ..
            } => write!(f, "status {}", code),
            ChildExit::Exited {
                code: None,
                signal: Some(sig),
            } => write!(f, "terminated by {}", signal_name(*sig)),
            ChildExit::Exited {
                code: None,
                signal: None,
            } => write!(f, "status unknown"),
            ChildExit::SpawnFailed => write!(f, "status -1"),
            ChildExit::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(unix)]
fn signal_name(sig: i32) -> String {
    match nix::sys::signal::Signal::try_from(sig) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => format!("signal {}", sig),
    }
}

#[cfg(not(unix))]
fn signal_name(sig: i32) -> String {
    format!("signal {}", sig)
}

/// Starts the helper for a given install path
#[derive(Debug, Clone)]
pub struct SideloadLauncher {
    program: PathBuf,
    argv0: String,
    mode_flag: String,
}

impl SideloadLauncher {
    pub fn new(
        program: impl Into<PathBuf>,
        argv0: impl Into<String>,
        mode_flag: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            argv0: argv0.into(),
            mode_flag: mode_flag.into(),
        }
    }

    pub fn from_settings(settings: &ChildSettings) -> Self {
        Self::new(&settings.program, &settings.argv0, &settings.mode_flag)
    }

    /// Spawn `<program> <mode_flag> <install_file>`
    pub fn spawn(&self, install_file: &Path) -> Result<Child> {
        let mut command = Command::new(&self.program);
        command
            .arg(&self.mode_flag)
            .arg(install_file)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.arg0(&self.argv0);

        debug!(
            "Spawning {} {} {}",
            self.program.display(),
            self.mode_flag,
            install_file.display()
        );
        command
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", self.program.display(), e)))
    }
}

/// Wait for the helper, killing it if `cancel` fires first
pub async fn wait_for_child(child: &mut Child, cancel: &CancellationToken) -> ChildExit {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ChildExit::from_status(status),
            Err(e) => {
                warn!("Failed to wait for sideload helper: {}", e);
                ChildExit::Exited { code: None, signal: None }
            }
        },
        _ = cancel.cancelled() => {
            info!("Sideload cancelled, stopping helper");
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill sideload helper: {}", e);
            }
            if let Err(e) = child.wait().await {
                warn!("Failed to reap sideload helper: {}", e);
            }
            ChildExit::Cancelled
        }
    }
}
