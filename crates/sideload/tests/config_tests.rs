//! Integration tests for configuration loading
//!
//! Run with: `cargo test -p sideload --test config_tests`

use sideload::SideloadConfig;
use std::path::PathBuf;
use tempfile::tempdir;

const FULL_CONFIG: &str = r#"
[sideload]
log_level = "debug"
install_file = "/sideload/package.zip"

[driver]
control_path = "/sys/class/android_usb/android0/enable"

[service]
name = "adbd"
debuggable_property = "ro.debuggable"
setprop = "/system/bin/setprop"
getprop = "/system/bin/getprop"

[child]
program = "/sbin/recovery"
argv0 = "recovery"
mode_flag = "--adbd"

[installer]
program = "/sbin/update_package"
args = ["--package", "{package}", "--wipe-marker"]
"#;

#[test]
fn test_full_config() {
    let config = SideloadConfig::from_toml(FULL_CONFIG).unwrap();

    assert_eq!(config.sideload.log_level, "debug");
    assert_eq!(
        config.sideload.install_file,
        PathBuf::from("/sideload/package.zip")
    );
    assert_eq!(config.service.setprop, PathBuf::from("/system/bin/setprop"));
    assert_eq!(config.child.argv0, "recovery");
    assert_eq!(config.installer.args.len(), 3);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = SideloadConfig::from_toml(
        r#"
[driver]
control_path = "/sys/class/udc/enable"
"#,
    )
    .unwrap();

    assert_eq!(config.driver.control_path, PathBuf::from("/sys/class/udc/enable"));
    assert_eq!(config.service.name, "adbd");
    assert_eq!(config.sideload.install_file, PathBuf::from("/tmp/update.zip"));
}

#[test]
fn test_section_missing_field_is_error() {
    // A present section must be complete
    let result = SideloadConfig::from_toml(
        r#"
[child]
program = "/sbin/recovery"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_invalid_log_level() {
    let result = SideloadConfig::from_toml(
        r#"
[sideload]
log_level = "verbose"
install_file = "/tmp/update.zip"
"#,
    );
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid log level"));
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("sideload.toml");

    let mut config = SideloadConfig::default();
    config.service.name = "minadbd".to_string();
    config.save(&path).unwrap();

    let loaded = SideloadConfig::load(Some(path)).unwrap();
    assert_eq!(loaded.service.name, "minadbd");
    assert_eq!(loaded.child.mode_flag, "--adbd");
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let result = SideloadConfig::load(Some(dir.path().join("absent.toml")));
    assert!(result.is_err());
}
