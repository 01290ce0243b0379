//! Downstream package installation
//!
//! Verification and installation of the received package happen outside the
//! sideload controller. [`CommandInstaller`] hands the package to an external
//! program and maps its exit code onto [`InstallOutcome`].

use async_trait::async_trait;
use common::InstallOutcome;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{InstallerSettings, PACKAGE_PLACEHOLDER};

/// Marker line an installer prints to request a cache wipe
pub const WIPE_CACHE_MARKER: &str = "wipe_cache=1";

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install the package at `path`
    ///
    /// Sets `wipe_cache` when the installer asks for the cache partition to
    /// be cleared afterwards.
    async fn install(&self, path: &Path, wipe_cache: &mut bool) -> InstallOutcome;
}

/// Installer that runs an external program
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInstaller {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &InstallerSettings) -> Self {
        Self::new(&settings.program, settings.args.clone())
    }

    fn expand_args(&self, path: &Path) -> Vec<String> {
        let package = path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PACKAGE_PLACEHOLDER, &package))
            .collect()
    }
}

#[async_trait]
impl PackageInstaller for CommandInstaller {
    async fn install(&self, path: &Path, wipe_cache: &mut bool) -> InstallOutcome {
        let args = self.expand_args(path);
        info!("Installing {} with {}", path.display(), self.program.display());
        debug!("Installer arguments: {:?}", args);

        let output = match Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run installer {}: {}", self.program.display(), e);
                return InstallOutcome::Error;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.lines().any(|line| line.trim() == WIPE_CACHE_MARKER) {
            debug!("Installer requested cache wipe");
            *wipe_cache = true;
        }

        let outcome = match output.status.code() {
            Some(code) => InstallOutcome::from_code(code),
            None => {
                warn!("Installer terminated abnormally: {}", output.status);
                InstallOutcome::Error
            }
        };
        info!("Installer finished: {}", outcome);
        outcome
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandInstaller {
        CommandInstaller::new(
            "/bin/sh",
            vec![
                "-c".to_string(),
                script.to_string(),
                "installer".to_string(),
                PACKAGE_PLACEHOLDER.to_string(),
            ],
        )
    }

    #[tokio::test]
    async fn test_success_code() {
        let mut wipe = false;
        let outcome = sh("exit 0").install(Path::new("/tmp/p.zip"), &mut wipe).await;
        assert_eq!(outcome, InstallOutcome::Success);
        assert!(!wipe);
    }

    #[tokio::test]
    async fn test_code_passthrough() {
        let mut wipe = false;
        let outcome = sh("exit 2").install(Path::new("/tmp/p.zip"), &mut wipe).await;
        assert_eq!(outcome, InstallOutcome::Corrupt);
    }

    #[tokio::test]
    async fn test_wipe_cache_marker() {
        let mut wipe = false;
        let outcome = sh("echo installing; echo wipe_cache=1")
            .install(Path::new("/tmp/p.zip"), &mut wipe)
            .await;
        assert_eq!(outcome, InstallOutcome::Success);
        assert!(wipe);
    }

    #[tokio::test]
    async fn test_package_path_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("update.zip");
        std::fs::write(&package, "PK").unwrap();

        let mut wipe = false;
        let outcome = sh("[ -f \"$1\" ]").install(&package, &mut wipe).await;
        assert_eq!(outcome, InstallOutcome::Success);

        let missing = dir.path().join("missing.zip");
        let outcome = sh("[ -f \"$1\" ]").install(&missing, &mut wipe).await;
        assert_eq!(outcome, InstallOutcome::Error);
    }

    #[test]
    fn test_expand_args_inline() {
        let installer = CommandInstaller::from_settings(&InstallerSettings::default());
        assert_eq!(
            installer.expand_args(Path::new("/tmp/update.zip")),
            vec!["--update_package=/tmp/update.zip".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let installer = CommandInstaller::new("/nonexistent/installer", vec![]);
        let mut wipe = false;
        assert_eq!(
            installer.install(Path::new("/tmp/p.zip"), &mut wipe).await,
            InstallOutcome::Error
        );
    }
}
