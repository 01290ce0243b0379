//! recovery-sideload
//!
//! Runs one `adb sideload` session from the recovery environment and
//! installs the received package.

use anyhow::{Context, Result};
use clap::Parser;
use common::{SharedSession, setup_logging};
use sideload::{SideloadConfig, SideloadController};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "recovery-sideload")]
#[command(
    author,
    version,
    about = "Receive a package over adb sideload and install it"
)]
#[command(long_about = "
Opens a USB receive window for `adb sideload`, waits for the package to
arrive, restores the USB driver and debug service state, and hands the
package to the installer.

EXAMPLES:
    # Run with default config
    recovery-sideload

    # Receive into a custom location
    recovery-sideload --install-file /tmp/sideload/package.zip

    # Run with debug logging
    recovery-sideload --log-level debug

CONFIGURATION:
    The configuration is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/recovery-sideload/sideload.toml
    3. /etc/recovery-sideload/sideload.toml
    4. Built-in defaults

EXIT STATUS:
    The install outcome code: 0 success, 1 error, 2 corrupt, 3 none,
    4 skipped, 5 retry.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Where the received package is written
    #[arg(short, long, value_name = "PATH")]
    install_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.save_config {
        let config = SideloadConfig::default();
        let path = SideloadConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = if let Some(ref path) = args.config {
        SideloadConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        SideloadConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.sideload.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("recovery-sideload v{}", env!("CARGO_PKG_VERSION"));

    let install_file = args
        .install_file
        .clone()
        .unwrap_or_else(|| config.sideload.install_file.clone());

    let session = SharedSession::new();
    let controller = SideloadController::from_config(&config, Arc::new(session.clone()));

    // Ctrl+C ends the receive window early
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let signal_handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, cancelling sideload");
                trigger.cancel();
            }
            Err(e) => error!("Error waiting for Ctrl+C: {}", e),
        }
    });

    let mut wipe_cache = false;
    let outcome = controller
        .run_session(&mut wipe_cache, &install_file, &cancel)
        .await;
    signal_handle.abort();

    info!("Install outcome: {} (wipe cache: {})", outcome, wipe_cache);
    println!("outcome={}", outcome);
    println!("wipe_cache={}", u8::from(wipe_cache));

    Ok(ExitCode::from(outcome.code() as u8))
}
