use std::fmt;
use std::time::Duration;

use crate::log_view::LogViewId;
use crate::upload::{SelectedFile, SessionId};

/// Handle for a repeating timer. The state that created it is its only owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// What a timer tick should produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerPurpose {
    /// Random increment in `[0, max_step)` for the upload bar.
    UploadProgress { session: SessionId, max_step: f32 },
    /// Random increment in `[0, max_step)` for the update bar.
    UpdateProgress { session: SessionId, max_step: f32 },
    LogPoll(LogViewId),
    Telemetry,
}

/// Which views a log fetch is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    View(LogViewId),
    /// Every open view; used after workflow actions.
    AllOpen,
}

/// The device exposes two ways to reset its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearLogRoute {
    /// `GET /clearlog`
    Get,
    /// `POST /log/clear`
    Post,
}

/// Pass-through device controls. Responses are opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    SetLed { colour: String },
    I2cCommand { cmd: u8 },
    ScanI2c,
    VersionCheck,
}

impl DeviceCommand {
    /// How long to wait before pulling the log the command writes to.
    pub fn log_refresh_delay(&self) -> Duration {
        match self {
            DeviceCommand::I2cCommand { .. } => Duration::from_millis(500),
            DeviceCommand::ScanI2c => Duration::from_millis(1000),
            DeviceCommand::SetLed { .. } | DeviceCommand::VersionCheck => Duration::ZERO,
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::SetLed { colour } => write!(f, "LED {colour}"),
            DeviceCommand::I2cCommand { cmd } => write!(f, "I2C command 0x{cmd:x}"),
            DeviceCommand::ScanI2c => write!(f, "I2C scan"),
            DeviceCommand::VersionCheck => write!(f, "Version check"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchCatalog,
    /// Independent delayed catalog fetches; every one fires.
    ScheduleCatalogRefreshes { delays: Vec<Duration> },
    FetchPackageInfo { filename: String },
    DeletePackage { filename: String },
    UploadFirmware { session: SessionId, file: SelectedFile },
    TriggerUpdate { session: SessionId },
    FetchLog { target: LogTarget, delay: Duration },
    ClearLog { view: LogViewId, route: ClearLogRoute },
    FetchTelemetry,
    SendDeviceCommand(DeviceCommand),
    StartTimer {
        timer: TimerId,
        every: Duration,
        purpose: TimerPurpose,
    },
    StopTimer { timer: TimerId },
}
