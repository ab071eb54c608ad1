mod app;
mod commands;
mod config;
mod effects;
mod presenter;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fwctl_core::{LogViewId, Msg};
use log::LevelFilter;

use crate::app::App;
use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};

/// Firmware lifecycle and log tailing client for the LED/I2C controller.
#[derive(Debug, Parser)]
#[command(name = "fwctl", version)]
struct Cli {
    /// RON configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Device base URL; overrides the config file.
    #[arg(long)]
    device: Option<String>,
    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Tail the log and run workflow commands typed on stdin (default).
    Watch {
        /// Firmware file to select at startup.
        #[arg(long)]
        firmware: Option<PathBuf>,
    },
    /// Print the packages stored on the device.
    Catalog,
    /// Print the details of one stored package.
    Info { filename: String },
    /// Print the device log once.
    Log,
    /// Print uptime and network details.
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("cannot load {}", cli.config.display()))?;
    if let Some(device) = cli.device {
        config.device_url = device;
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    fwctl_logging::initialize(config.log_destination, level, config.log_file.as_deref());

    let app = App::new(&config)?;
    let timeout = Duration::from_millis(config.request_timeout_ms) + Duration::from_secs(1);
    match cli.command.unwrap_or(Mode::Watch { firmware: None }) {
        Mode::Watch { firmware } => app.watch(firmware),
        Mode::Catalog => app.run_once(Msg::CatalogRefreshRequested, timeout),
        Mode::Info { filename } => app.run_once(Msg::PackageInfoRequested { filename }, timeout),
        Mode::Log => app.run_once(Msg::LogRefreshRequested(LogViewId::PRIMARY), timeout),
        Mode::Status => app.run_once(Msg::TelemetryPollDue, timeout),
    }
}
