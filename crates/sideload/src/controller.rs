//! Sideload session controller
//!
//! Runs one sideload session end to end:
//!
//! 1. Stop the debug service and switch the USB gadget driver off
//! 2. Switch the driver back on and prompt the operator
//! 3. Start the helper that receives the package and publish its pid
//! 4. Wait for the helper (cancellable)
//! 5. Withdraw the cancel affordance
//! 6. Switch the driver off
//! 7. Restart the debug service if the device is debuggable
//! 8. Check that a package arrived
//! 9. Hand it to the installer
//!
//! Step 6 happens on every path out of the receive window. Driver and
//! property failures are logged and never end the session early.

use common::{CHILD_PID_KEY, HAS_CANCEL_KEY, InstallOutcome, SessionSink};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::child::{ChildExit, SideloadLauncher, wait_for_child};
use crate::config::SideloadConfig;
use crate::driver::{DriverControl, SysfsDriver, UsbWindow, set_usb_driver};
use crate::installer::{CommandInstaller, PackageInstaller};
use crate::operator::{ConsoleOperator, Operator};
use crate::property::{PropertyService, SystemProperties, read_flag, start_service, stop_service};

pub const SEND_PACKAGE_PROMPT: &str = "\n\nNow send the package you want to apply\n\
                                       to the device with \"adb sideload <filename>\"...";
pub const NO_PACKAGE_MESSAGE: &str = "No package received.";
pub const CANCELLED_MESSAGE: &str = "Sideload cancelled.";

pub struct SideloadController {
    driver: Arc<dyn DriverControl>,
    properties: Arc<dyn PropertyService>,
    session: Arc<dyn SessionSink>,
    installer: Arc<dyn PackageInstaller>,
    operator: Arc<dyn Operator>,
    launcher: SideloadLauncher,
    service_name: String,
    debuggable_property: String,
}

impl SideloadController {
    pub fn new(
        launcher: SideloadLauncher,
        driver: Arc<dyn DriverControl>,
        properties: Arc<dyn PropertyService>,
        session: Arc<dyn SessionSink>,
        installer: Arc<dyn PackageInstaller>,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            driver,
            properties,
            session,
            installer,
            operator,
            launcher,
            service_name: "adbd".to_string(),
            debuggable_property: "ro.debuggable".to_string(),
        }
    }

    /// Override the debug service name and the property gating its restart
    pub fn with_service(
        mut self,
        service_name: impl Into<String>,
        debuggable_property: impl Into<String>,
    ) -> Self {
        self.service_name = service_name.into();
        self.debuggable_property = debuggable_property.into();
        self
    }

    /// Controller wired to the real device
    pub fn from_config(config: &SideloadConfig, session: Arc<dyn SessionSink>) -> Self {
        Self::new(
            SideloadLauncher::from_settings(&config.child),
            Arc::new(SysfsDriver::new(&config.driver.control_path)),
            Arc::new(SystemProperties::new(
                &config.service.setprop,
                &config.service.getprop,
            )),
            session,
            Arc::new(CommandInstaller::from_settings(&config.installer)),
            Arc::new(ConsoleOperator),
        )
        .with_service(&config.service.name, &config.service.debuggable_property)
    }

    /// Run one sideload session and install whatever was received
    ///
    /// `wipe_cache` is set by the installer when it wants the cache
    /// partition cleared. A cancelled session installs nothing and returns
    /// [`InstallOutcome::None`].
    pub async fn run_session(
        &self,
        wipe_cache: &mut bool,
        install_file: &Path,
        cancel: &CancellationToken,
    ) -> InstallOutcome {
        info!("Starting sideload session into {}", install_file.display());

        stop_service(self.properties.as_ref(), &self.service_name).await;
        set_usb_driver(self.driver.as_ref(), false);

        let window = UsbWindow::open(self.driver.as_ref());
        self.operator.print(SEND_PACKAGE_PROMPT);

        let exit = self.receive(install_file, cancel).await;
        match exit {
            ChildExit::Cancelled => {}
            exit if !exit.is_success() => self.operator.print(&exit.to_string()),
            _ => debug!("Sideload helper exited cleanly"),
        }

        self.session.set_bool(HAS_CANCEL_KEY, false);
        window.close();
        self.maybe_restart_service().await;

        if exit == ChildExit::Cancelled {
            self.operator.print(CANCELLED_MESSAGE);
            return InstallOutcome::None;
        }

        match tokio::fs::metadata(install_file).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.operator.print(NO_PACKAGE_MESSAGE);
                return InstallOutcome::Error;
            }
            Err(e) => {
                self.operator
                    .print(&format!("Error reading package:\n  {}", e));
                return InstallOutcome::Error;
            }
        }

        self.installer.install(install_file, wipe_cache).await
    }

    /// Start the helper and wait for it to finish
    ///
    /// A helper that cannot be started is treated as one that exited with
    /// an error straight away.
    async fn receive(&self, install_file: &Path, cancel: &CancellationToken) -> ChildExit {
        let mut child = match self.launcher.spawn(install_file) {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start sideload helper: {}", e);
                return ChildExit::SpawnFailed;
            }
        };

        if let Some(pid) = child.id() {
            debug!("Sideload helper running as pid {}", pid);
            self.session.set_int(CHILD_PID_KEY, i64::from(pid));
        }
        self.session.set_bool(HAS_CANCEL_KEY, true);

        wait_for_child(&mut child, cancel).await
    }

    async fn maybe_restart_service(&self) {
        if read_flag(self.properties.as_ref(), &self.debuggable_property).await {
            self.operator
                .print(&format!("Restarting {}...", self.service_name));
            set_usb_driver(self.driver.as_ref(), true);
            start_service(self.properties.as_ref(), &self.service_name).await;
        }
    }
}
