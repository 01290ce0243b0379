//! Sideload session controller for a device recovery environment
//!
//! Opens a USB receive window, runs the helper that accepts a package from
//! `adb sideload`, restores the device state and hands the package to the
//! installer.

pub mod child;
pub mod config;
pub mod controller;
pub mod driver;
pub mod installer;
pub mod operator;
pub mod property;
pub mod test_utils;

pub use child::{ChildExit, SideloadLauncher};
pub use config::SideloadConfig;
pub use controller::SideloadController;
pub use driver::{DriverControl, DriverError, SysfsDriver, UsbWindow};
pub use installer::{CommandInstaller, PackageInstaller};
pub use operator::{ConsoleOperator, Operator};
pub use property::{PropertyService, SystemProperties};
