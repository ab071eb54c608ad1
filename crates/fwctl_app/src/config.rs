//! RON configuration for the `fwctl` binary.
//!
//! Every field has a default, so a partial file (or no file) is fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fwctl_core::CoreSettings;
use fwctl_engine::EngineSettings;
use fwctl_logging::{fwctl_info, LogDestination};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "./fwctl.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device_url: String,
    pub log_poll_ms: u64,
    pub telemetry_poll_ms: u64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub log_row_height_px: f64,
    /// Rows of log shown in watch mode.
    pub log_rows: u32,
    pub log_destination: LogDestination,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_url: "http://192.168.4.1".to_string(),
            log_poll_ms: 2000,
            telemetry_poll_ms: 1000,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            log_row_height_px: 18.0,
            log_rows: 20,
            log_destination: LogDestination::Terminal,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = ron::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fwctl_info!("loaded config from {:?}", path);
        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            base_url: self.device_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..EngineSettings::default()
        }
    }

    pub fn core_settings(&self) -> CoreSettings {
        CoreSettings {
            log_poll_interval: Duration::from_millis(self.log_poll_ms),
            telemetry_interval: Duration::from_millis(self.telemetry_poll_ms),
            log_row_height_px: self.log_row_height_px,
            ..CoreSettings::default()
        }
    }

    pub fn log_viewport_px(&self) -> f64 {
        f64::from(self.log_rows) * self.log_row_height_px
    }
}
