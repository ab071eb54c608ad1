use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catalog::{CatalogSnapshot, CatalogState, PackageInfo};
use crate::log_text::LogEntry;
use crate::log_view::{LogView, LogViewId};
use crate::telemetry::DeviceTelemetry;
use crate::upload::{UpdateState, UploadState};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub upload: UploadView,
    pub update: UpdateView,
    pub catalog: CatalogView,
    pub logs: Vec<LogViewModel>,
    pub package_info: Option<PackageInfo>,
    pub telemetry: Option<DeviceTelemetry>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadView {
    pub state: UploadState,
    pub file_name: Option<String>,
    pub progress: f32,
    pub status: String,
    pub can_upload: bool,
    pub can_update: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateView {
    pub state: UpdateState,
    pub progress: f32,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogStatus {
    #[default]
    NotLoaded,
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogView {
    pub status: CatalogStatus,
    /// Board ascending, then newest version first.
    pub rows: Vec<PackageRow>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CatalogView {
    pub fn from_snapshot(snapshot: Option<&CatalogSnapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };
        let status = match snapshot.state {
            CatalogState::Empty => CatalogStatus::Empty,
            CatalogState::Populated => CatalogStatus::Populated,
        };
        let rows = snapshot
            .sorted_for_display()
            .into_iter()
            .map(|record| PackageRow {
                filename: record.filename.clone(),
                size: record.display_size(),
                version: record.version.clone(),
                board: record.board.clone(),
                build_date: record.build_date.clone(),
            })
            .collect();
        Self {
            status,
            rows,
            fetched_at: Some(snapshot.fetched_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub filename: String,
    pub size: String,
    pub version: String,
    pub board: String,
    pub build_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogViewModel {
    pub id: LogViewId,
    pub entries: Vec<LogEntry>,
    pub auto_refresh: bool,
    pub auto_scroll: bool,
    /// "ON (2s)" or "OFF".
    pub auto_refresh_label: String,
    pub offset_px: f64,
    pub at_bottom: bool,
}

impl LogViewModel {
    pub(crate) fn from_view(view: &LogView, poll_interval: Duration) -> Self {
        let auto_refresh_label = if view.auto_refresh() {
            format!("ON ({}s)", poll_interval.as_secs_f32())
        } else {
            "OFF".to_string()
        };
        Self {
            id: view.id(),
            entries: view.entries().to_vec(),
            auto_refresh: view.auto_refresh(),
            auto_scroll: view.auto_scroll(),
            auto_refresh_label,
            offset_px: view.scroll().offset_px,
            at_bottom: view.is_at_bottom(),
        }
    }
}
