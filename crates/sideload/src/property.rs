//! Property service access
//!
//! Services are started and stopped through the `ctl.start` / `ctl.stop`
//! control properties. The production backend shells out to the platform's
//! `setprop` and `getprop` tools.

use async_trait::async_trait;
use common::{Error, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const CTL_START: &str = "ctl.start";
pub const CTL_STOP: &str = "ctl.stop";

#[async_trait]
pub trait PropertyService: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read a property, `None` when it is unset or empty
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Property service backed by the `setprop` / `getprop` tools
#[derive(Debug, Clone)]
pub struct SystemProperties {
    setprop: PathBuf,
    getprop: PathBuf,
}

impl SystemProperties {
    pub fn new(setprop: impl Into<PathBuf>, getprop: impl Into<PathBuf>) -> Self {
        Self {
            setprop: setprop.into(),
            getprop: getprop.into(),
        }
    }
}

#[async_trait]
impl PropertyService for SystemProperties {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let status = Command::new(&self.setprop)
            .arg(key)
            .arg(value)
            .status()
            .await
            .map_err(|e| Error::Property(format!("{}: {}", self.setprop.display(), e)))?;

        if !status.success() {
            return Err(Error::Property(format!(
                "setprop {} {} failed with {}",
                key, value, status
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let output = Command::new(&self.getprop)
            .arg(key)
            .output()
            .await
            .map_err(|e| Error::Property(format!("{}: {}", self.getprop.display(), e)))?;

        if !output.status.success() {
            return Err(Error::Property(format!(
                "getprop {} failed with {}",
                key, output.status
            )));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if value.is_empty() { None } else { Some(value) })
    }
}

/// Interpret a boolean-like property value
///
/// True only for a single character other than `0`.
pub fn is_truthy(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let mut chars = value.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c != '0')
}

/// Ask the service manager to stop `service`, logging failures
pub async fn stop_service(properties: &dyn PropertyService, service: &str) {
    debug!("Stopping {}", service);
    if let Err(e) = properties.set(CTL_STOP, service).await {
        warn!("Failed to stop {}: {}", service, e);
    }
}

/// Ask the service manager to start `service`, logging failures
pub async fn start_service(properties: &dyn PropertyService, service: &str) {
    info!("Starting {}", service);
    if let Err(e) = properties.set(CTL_START, service).await {
        warn!("Failed to start {}: {}", service, e);
    }
}

/// Read a boolean-like flag; unreadable properties count as false
pub async fn read_flag(properties: &dyn PropertyService, key: &str) -> bool {
    match properties.get(key).await {
        Ok(value) => {
            let flag = is_truthy(value.as_deref());
            debug!("{} = {:?} ({})", key, value, flag);
            flag
        }
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            false
        }
    }
}
