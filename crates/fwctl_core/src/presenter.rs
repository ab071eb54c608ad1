use crate::catalog::PackageInfo;
use crate::log_view::LogViewId;
use crate::telemetry::DeviceTelemetry;
use crate::view_model::{CatalogView, LogViewModel, UpdateView, UploadView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user-visible notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
}

impl Notification {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Rendering callbacks implemented by the front end.
///
/// The core calls these from [`crate::AppState::render`] only for sections
/// that changed; it never reaches into presentation itself.
pub trait Presenter {
    fn on_catalog_updated(&mut self, catalog: &CatalogView);
    fn on_upload_state_changed(&mut self, upload: &UploadView);
    fn on_update_state_changed(&mut self, update: &UpdateView);
    fn on_log_entries_changed(&mut self, view: LogViewId, log: &LogViewModel);
    fn on_package_info(&mut self, _info: &PackageInfo) {}
    fn on_telemetry(&mut self, _telemetry: &DeviceTelemetry) {}
    fn notify(&mut self, notification: &Notification);
}
