use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::time::Duration;

use crate::catalog::{CatalogSnapshot, PackageInfo};
use crate::effect::TimerId;
use crate::error::CoreError;
use crate::log_view::{LogView, LogViewId};
use crate::presenter::{Notification, Presenter, Severity};
use crate::telemetry::DeviceTelemetry;
use crate::upload::{SessionId, UpdateSession, UpdateState, UploadSession, UploadState};
use crate::view_model::{AppViewModel, CatalogView, LogViewModel, UpdateView, UploadView};

/// Timing knobs of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    pub log_poll_interval: Duration,
    pub telemetry_interval: Duration,
    pub upload_tick: Duration,
    pub update_tick: Duration,
    /// Delays, from upload completion, of the catalog refreshes that give the
    /// device's storage time to settle.
    pub catalog_refresh_delays: Vec<Duration>,
    pub log_row_height_px: f64,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            log_poll_interval: Duration::from_secs(2),
            telemetry_interval: Duration::from_secs(1),
            upload_tick: Duration::from_millis(200),
            update_tick: Duration::from_millis(300),
            catalog_refresh_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(6),
            ],
            log_row_height_px: 18.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Dirty {
    upload: bool,
    update: bool,
    catalog: bool,
    package_info: bool,
    telemetry: bool,
    logs: BTreeSet<LogViewId>,
}

impl Dirty {
    fn any(&self) -> bool {
        self.upload
            || self.update
            || self.catalog
            || self.package_info
            || self.telemetry
            || !self.logs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    settings: CoreSettings,
    pub(crate) upload: UploadSession,
    pub(crate) upload_status: String,
    pub(crate) update: UpdateSession,
    pub(crate) update_status: String,
    pub(crate) catalog: Option<CatalogSnapshot>,
    pub(crate) package_info: Option<PackageInfo>,
    pub(crate) logs: BTreeMap<LogViewId, LogView>,
    pub(crate) telemetry: Option<DeviceTelemetry>,
    pub(crate) telemetry_timer: Option<TimerId>,
    notifications: Vec<Notification>,
    last_error: Option<CoreError>,
    next_session: SessionId,
    next_timer: u64,
    dirty: Dirty,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(CoreSettings::default())
    }

    pub fn with_settings(settings: CoreSettings) -> Self {
        let mut logs = BTreeMap::new();
        logs.insert(
            LogViewId::PRIMARY,
            LogView::new(LogViewId::PRIMARY, settings.log_row_height_px),
        );
        Self {
            settings,
            upload: UploadSession::default(),
            upload_status: "No firmware selected".to_string(),
            update: UpdateSession::default(),
            update_status: String::new(),
            catalog: None,
            package_info: None,
            logs,
            telemetry: None,
            telemetry_timer: None,
            notifications: Vec::new(),
            last_error: None,
            next_session: 1,
            next_timer: 1,
            dirty: Dirty::default(),
        }
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn upload(&self) -> &UploadSession {
        &self.upload
    }

    pub fn update_session(&self) -> &UpdateSession {
        &self.update
    }

    pub fn catalog(&self) -> Option<&CatalogSnapshot> {
        self.catalog.as_ref()
    }

    pub fn package_info(&self) -> Option<&PackageInfo> {
        self.package_info.as_ref()
    }

    pub fn log_view(&self, id: LogViewId) -> Option<&LogView> {
        self.logs.get(&id)
    }

    pub fn telemetry(&self) -> Option<&DeviceTelemetry> {
        self.telemetry.as_ref()
    }

    /// The most recent request rejected before reaching the device.
    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    /// Notifications queued since the last render.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Every timer handle currently owned by some part of the state.
    pub fn active_timers(&self) -> Vec<TimerId> {
        let mut timers: Vec<TimerId> = [
            self.upload.ticker(),
            self.update.ticker(),
            self.telemetry_timer,
        ]
        .into_iter()
        .flatten()
        .collect();
        timers.extend(self.logs.values().filter_map(LogView::poll_timer));
        timers.sort();
        timers
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            upload: self.upload_view(),
            update: self.update_view(),
            catalog: CatalogView::from_snapshot(self.catalog.as_ref()),
            logs: self
                .logs
                .values()
                .map(|view| LogViewModel::from_view(view, self.settings.log_poll_interval))
                .collect(),
            package_info: self.package_info.clone(),
            telemetry: self.telemetry.clone(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            dirty: self.dirty.any() || !self.notifications.is_empty(),
        }
    }

    /// Returns whether anything changed since the last call, and clears the flags.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty.any() || !self.notifications.is_empty();
        self.dirty = Dirty::default();
        self.notifications.clear();
        was_dirty
    }

    /// Pushes every changed section, then queued notifications, to `presenter`.
    pub fn render(&mut self, presenter: &mut dyn Presenter) {
        let dirty = mem::take(&mut self.dirty);
        if dirty.catalog {
            presenter.on_catalog_updated(&CatalogView::from_snapshot(self.catalog.as_ref()));
        }
        if dirty.upload {
            presenter.on_upload_state_changed(&self.upload_view());
        }
        if dirty.update {
            presenter.on_update_state_changed(&self.update_view());
        }
        for id in &dirty.logs {
            if let Some(view) = self.logs.get(id) {
                let model = LogViewModel::from_view(view, self.settings.log_poll_interval);
                presenter.on_log_entries_changed(*id, &model);
            }
        }
        if dirty.package_info {
            if let Some(info) = &self.package_info {
                presenter.on_package_info(info);
            }
        }
        if dirty.telemetry {
            if let Some(telemetry) = &self.telemetry {
                presenter.on_telemetry(telemetry);
            }
        }
        for notification in self.notifications.drain(..) {
            presenter.notify(&notification);
        }
    }

    fn upload_view(&self) -> UploadView {
        let state = self.upload.state();
        UploadView {
            state,
            file_name: self.upload.file().map(|f| f.name.clone()),
            progress: self.upload.progress(),
            status: self.upload_status.clone(),
            can_upload: matches!(state, UploadState::Selected | UploadState::Failed),
            can_update: state == UploadState::Uploaded
                && self.update.state() != UpdateState::Updating,
        }
    }

    fn update_view(&self) -> UpdateView {
        UpdateView {
            state: self.update.state(),
            progress: self.update.progress(),
            status: self.update_status.clone(),
        }
    }

    pub(crate) fn next_session_id(&mut self) -> SessionId {
        let id = self.next_session;
        self.next_session += 1;
        id
    }

    pub(crate) fn next_timer_id(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }

    pub(crate) fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        self.notifications.push(Notification::new(severity, text));
    }

    pub(crate) fn reject(&mut self, error: CoreError) {
        self.notify(Severity::Warning, error.to_string());
        self.last_error = Some(error);
    }

    pub(crate) fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn mark_upload(&mut self) {
        self.dirty.upload = true;
    }

    pub(crate) fn mark_update(&mut self) {
        self.dirty.update = true;
    }

    pub(crate) fn mark_catalog(&mut self) {
        self.dirty.catalog = true;
    }

    pub(crate) fn mark_package_info(&mut self) {
        self.dirty.package_info = true;
    }

    pub(crate) fn mark_telemetry(&mut self) {
        self.dirty.telemetry = true;
    }

    pub(crate) fn mark_log(&mut self, id: LogViewId) {
        self.dirty.logs.insert(id);
    }
}
