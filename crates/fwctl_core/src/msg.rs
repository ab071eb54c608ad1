use crate::catalog::{CatalogSnapshot, PackageInfo};
use crate::effect::{DeviceCommand, LogTarget, TimerId};
use crate::error::DeviceError;
use crate::log_text::LogEntry;
use crate::log_view::LogViewId;
use crate::telemetry::DeviceTelemetry;
use crate::upload::{SelectedFile, SessionId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Front end is up: load the catalog, the log and start the pollers.
    Started,
    /// User picked a file to upload.
    FileSelected(SelectedFile),
    /// User clicked Upload.
    UploadClicked,
    /// User clicked Update.
    UpdateClicked,
    /// User clicked Cancel.
    CancelClicked,
    /// Simulated upload progress tick.
    UploadProgressTick { session: SessionId, increment: f32 },
    /// Upload request finished; `Ok` carries the response body.
    UploadCompleted {
        session: SessionId,
        result: Result<String, DeviceError>,
    },
    /// Simulated update progress tick.
    UpdateProgressTick { session: SessionId, increment: f32 },
    /// Update request finished; `Ok` carries the response body.
    UpdateCompleted {
        session: SessionId,
        result: Result<String, DeviceError>,
    },
    /// User asked for a fresh package list.
    CatalogRefreshRequested,
    CatalogFetched(Result<CatalogSnapshot, DeviceError>),
    PackageInfoRequested { filename: String },
    PackageInfoFetched {
        filename: String,
        result: Result<PackageInfo, DeviceError>,
    },
    /// Deletion already confirmed by the user.
    DeleteConfirmed { filename: String },
    DeleteCompleted {
        filename: String,
        result: Result<String, DeviceError>,
    },
    /// User asked for a one-off log refresh of a view.
    LogRefreshRequested(LogViewId),
    /// Auto-refresh timer fired for a view.
    LogPollDue { view: LogViewId, timer: TimerId },
    LogFetched {
        target: LogTarget,
        result: Result<Vec<LogEntry>, DeviceError>,
    },
    LogViewOpened(LogViewId),
    LogViewClosed(LogViewId),
    AutoRefreshToggled(LogViewId),
    AutoScrollToggled(LogViewId),
    /// Front end reports the user's scroll position.
    LogViewScrolled { view: LogViewId, offset_px: f64 },
    /// Front end reports the visible height of a view.
    LogViewResized { view: LogViewId, viewport_px: f64 },
    ClearLogClicked(LogViewId),
    LogCleared {
        view: LogViewId,
        result: Result<String, DeviceError>,
    },
    TelemetryPollDue,
    TelemetryFetched(Result<DeviceTelemetry, DeviceError>),
    DeviceCommandRequested(DeviceCommand),
    DeviceCommandCompleted {
        command: DeviceCommand,
        result: Result<String, DeviceError>,
    },
}
