//! fwctl core: device text parsers, workflow state machine and view models.
mod catalog;
mod effect;
mod error;
mod log_text;
mod log_view;
mod msg;
mod presenter;
mod records;
mod state;
mod telemetry;
mod update;
mod upload;
mod view_model;

pub use catalog::{
    compare_versions, CatalogSnapshot, CatalogState, FirmwarePackageRecord, PackageInfo,
    PACKAGE_FIELDS, PACKAGE_INFO_FIELDS, PACKAGE_NOT_FOUND_MARKER,
};
pub use effect::{ClearLogRoute, DeviceCommand, Effect, LogTarget, TimerId, TimerPurpose};
pub use error::{CoreError, DeviceError, TransportKind};
pub use log_text::{parse_log_entries, LogEntry};
pub use log_view::{LogView, LogViewId, ScrollMetrics, SCROLL_BOTTOM_TOLERANCE_PX};
pub use msg::Msg;
pub use presenter::{Notification, Presenter, Severity};
pub use records::{
    format_size, ParsedRecords, Record, RecordParser, SizeField, NO_PACKAGES_SENTINEL,
    RECORD_DELIMITER, UNKNOWN,
};
pub use state::{AppState, CoreSettings};
pub use telemetry::DeviceTelemetry;
pub use update::update;
pub use upload::{
    is_firmware_file, update_completion, upload_completion, Completion, ProgressProfile,
    SelectedFile, SessionId, UpdateSession, UpdateState, UploadSession, UploadState,
    FIRMWARE_EXTENSION, UPDATE_SUCCESS_PHRASE, UPLOAD_SUCCESS_TOKEN,
};
pub use view_model::{
    AppViewModel, CatalogStatus, CatalogView, LogViewModel, PackageRow, UpdateView, UploadView,
};
