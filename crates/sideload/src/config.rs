//! Sideload configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the package path in installer arguments
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SideloadConfig {
    #[serde(default)]
    pub sideload: SessionSettings,
    #[serde(default)]
    pub driver: DriverSettings,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub child: ChildSettings,
    #[serde(default)]
    pub installer: InstallerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub log_level: String,
    /// Where the helper writes the received package
    pub install_file: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            install_file: PathBuf::from("/tmp/update.zip"),
        }
    }
}

/// USB gadget driver control node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSettings {
    pub control_path: PathBuf,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            control_path: PathBuf::from("/sys/class/android_usb/android0/enable"),
        }
    }
}

/// Debug service and property tooling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name passed to `ctl.start` / `ctl.stop`
    pub name: String,
    pub debuggable_property: String,
    pub setprop: PathBuf,
    pub getprop: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "adbd".to_string(),
            debuggable_property: "ro.debuggable".to_string(),
            setprop: PathBuf::from("setprop"),
            getprop: PathBuf::from("getprop"),
        }
    }
}

/// Sideload helper process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSettings {
    pub program: PathBuf,
    pub argv0: String,
    pub mode_flag: String,
}

impl Default for ChildSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/sbin/recovery"),
            argv0: "recovery".to_string(),
            mode_flag: "--adbd".to_string(),
        }
    }
}

/// Downstream package installer
///
/// # Example Configuration
/// ```toml
/// [installer]
/// program = "/sbin/recovery"
/// args = ["--update_package={package}"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerSettings {
    pub program: PathBuf,
    /// Arguments; every occurrence of `{package}` is replaced by the path
    pub args: Vec<String>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/sbin/recovery"),
            args: vec![format!("--update_package={}", PACKAGE_PLACEHOLDER)],
        }
    }
}

impl SideloadConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/recovery-sideload/sideload.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: SideloadConfig = toml::from_str(content)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("recovery-sideload").join("sideload.toml")
        } else {
            PathBuf::from(".config/recovery-sideload/sideload.toml")
        }
    }

    fn expand_paths(&mut self) {
        self.sideload.install_file = expand(&self.sideload.install_file);
        self.driver.control_path = expand(&self.driver.control_path);
        self.service.setprop = expand(&self.service.setprop);
        self.service.getprop = expand(&self.service.getprop);
        self.child.program = expand(&self.child.program);
        self.installer.program = expand(&self.installer.program);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.sideload.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.sideload.log_level,
                valid_levels.join(", ")
            ));
        }

        Self::require_path(&self.sideload.install_file, "sideload.install_file")?;
        Self::require_path(&self.driver.control_path, "driver.control_path")?;
        Self::require_path(&self.child.program, "child.program")?;
        Self::require_path(&self.installer.program, "installer.program")?;

        if self.service.name.trim().is_empty() {
            return Err(anyhow!("service.name must not be empty"));
        }
        if self.service.debuggable_property.trim().is_empty() {
            return Err(anyhow!("service.debuggable_property must not be empty"));
        }
        if self.child.mode_flag.trim().is_empty() {
            return Err(anyhow!("child.mode_flag must not be empty"));
        }

        if !self
            .installer
            .args
            .iter()
            .any(|arg| arg.contains(PACKAGE_PLACEHOLDER))
        {
            return Err(anyhow!(
                "installer.args must reference the package path with '{}'",
                PACKAGE_PLACEHOLDER
            ));
        }

        Ok(())
    }

    fn require_path(path: &Path, name: &str) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("{} must not be empty", name));
        }
        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SideloadConfig::default();
        assert_eq!(config.sideload.log_level, "info");
        assert_eq!(config.service.name, "adbd");
        assert_eq!(config.child.mode_flag, "--adbd");
        assert_eq!(
            config.driver.control_path,
            PathBuf::from("/sys/class/android_usb/android0/enable")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SideloadConfig::from_toml("").unwrap();
        assert_eq!(config.service.debuggable_property, "ro.debuggable");
        assert_eq!(config.child.program, PathBuf::from("/sbin/recovery"));
    }

    #[test]
    fn test_config_serialization() {
        let config = SideloadConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = SideloadConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.sideload.log_level, parsed.sideload.log_level);
        assert_eq!(config.installer.args, parsed.installer.args);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = SideloadConfig::default();
        config.sideload.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.sideload.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_installer_args_need_placeholder() {
        let mut config = SideloadConfig::default();
        config.installer.args = vec!["--update_package".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let mut config = SideloadConfig::default();
        config.service.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let config = SideloadConfig::from_toml(
            r#"
[sideload]
log_level = "info"
install_file = "~/update.zip"
"#,
        )
        .unwrap();
        assert!(!config.sideload.install_file.starts_with("~"));
        assert!(config.sideload.install_file.ends_with("update.zip"));
    }

    #[test]
    fn test_tilde_expansion_all_paths() {
        let config = SideloadConfig::from_toml(
            r#"
[driver]
control_path = "~/gadget/enable"

[service]
name = "adbd"
debuggable_property = "ro.debuggable"
setprop = "~/bin/setprop"
getprop = "~/bin/getprop"
"#,
        )
        .unwrap();
        for path in [
            &config.driver.control_path,
            &config.service.setprop,
            &config.service.getprop,
        ] {
            assert!(!path.starts_with("~"), "unexpanded: {}", path.display());
        }
        assert!(config.driver.control_path.ends_with("gadget/enable"));
        assert!(config.service.getprop.ends_with("bin/getprop"));
    }
}
