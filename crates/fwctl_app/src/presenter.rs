use std::collections::HashMap;
use std::io::Write;

use chrono::Local;
use fwctl_core::{
    CatalogStatus, CatalogView, DeviceTelemetry, LogEntry, LogViewId, LogViewModel,
    Notification, PackageInfo, Presenter, Severity, UpdateState, UpdateView, UploadState,
    UploadView,
};
use fwctl_logging::fwctl_warn;

const BAR_WIDTH: usize = 30;

/// Plain-text rendering of the view sections to any writer.
pub struct TerminalPresenter<W: Write> {
    out: W,
    /// Entries already printed per view, so a poll only prints what is new.
    printed: HashMap<LogViewId, Vec<LogEntry>>,
    /// Uptime changes every poll; only a new address or source is worth a line.
    telemetry_identity: Option<String>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: HashMap::new(),
            telemetry_identity: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            fwctl_warn!("terminal write failed: {}", err);
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn on_catalog_updated(&mut self, catalog: &CatalogView) {
        match catalog.status {
            CatalogStatus::NotLoaded => return,
            CatalogStatus::Empty => {
                self.line("No firmware packages stored on the device.");
                return;
            }
            CatalogStatus::Populated => {}
        }
        let header = format!(
            "{:<32} {:>10} {:<10} {:<14} {}",
            "FILENAME", "SIZE", "VERSION", "BOARD", "BUILD DATE"
        );
        self.line(&header);
        for row in &catalog.rows {
            let text = format!(
                "{:<32} {:>10} {:<10} {:<14} {}",
                row.filename, row.size, row.version, row.board, row.build_date
            );
            self.line(&text);
        }
        if let Some(fetched_at) = catalog.fetched_at {
            let local = fetched_at.with_timezone(&Local);
            let text = format!(
                "{} package(s), fetched {}",
                catalog.rows.len(),
                local.format("%H:%M:%S")
            );
            self.line(&text);
        }
    }

    fn on_upload_state_changed(&mut self, upload: &UploadView) {
        let text = match upload.state {
            UploadState::Uploading => {
                format!("upload {} {}", progress_bar(upload.progress), upload.status)
            }
            _ => format!("upload: {}", upload.status),
        };
        self.line(&text);
    }

    fn on_update_state_changed(&mut self, update: &UpdateView) {
        let text = match update.state {
            UpdateState::Idle if update.status.is_empty() => return,
            UpdateState::Updating => {
                format!("update {} {}", progress_bar(update.progress), update.status)
            }
            _ => format!("update: {}", update.status),
        };
        self.line(&text);
    }

    fn on_log_entries_changed(&mut self, view: LogViewId, log: &LogViewModel) {
        let previous = self.printed.remove(&view).unwrap_or_default();
        // A fresh snapshot that still starts with what we printed only adds lines.
        let start = if log.entries.starts_with(&previous) {
            previous.len()
        } else {
            0
        };
        for entry in &log.entries[start..] {
            let text = if entry.timestamp.is_empty() {
                format!("[{view}] {}", entry.message)
            } else {
                format!("[{view}] {} {}", entry.timestamp, entry.message)
            };
            self.line(&text);
        }
        self.printed.insert(view, log.entries.clone());
    }

    fn on_package_info(&mut self, info: &PackageInfo) {
        let lines = [
            format!("package:     {}", info.filename),
            format!("size:        {}", fwctl_core::format_size(info.size)),
            format!("type:        {}", info.kind),
            format!("version:     {}", info.version),
            format!("board:       {}", info.board),
            format!("build date:  {}", info.build_date),
            format!("modified:    {}", info.modified),
            format!("description: {}", info.description),
            format!("features:    {}", info.features.join(", ")),
        ];
        for text in lines {
            self.line(&text);
        }
    }

    fn on_telemetry(&mut self, telemetry: &DeviceTelemetry) {
        let identity = match telemetry {
            DeviceTelemetry::Network { ip, mac, .. } => format!("{ip}/{mac}"),
            DeviceTelemetry::Raw(_) => String::new(),
        };
        if self.telemetry_identity.as_ref() == Some(&identity) {
            return;
        }
        self.telemetry_identity = Some(identity);
        let text = match telemetry {
            DeviceTelemetry::Network { uptime, ip, mac, .. } => format!(
                "device: up {uptime} | {ip} | {mac} | {}",
                telemetry.rssi_label().unwrap_or_else(|| "-".to_string())
            ),
            DeviceTelemetry::Raw(text) => format!("device: {text}"),
        };
        self.line(&text);
    }

    fn notify(&mut self, notification: &Notification) {
        let label = match notification.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        let text = format!("{label}: {}", notification.text);
        self.line(&text);
    }
}

fn progress_bar(percent: f32) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        percent
    )
}
