use std::time::Duration;

use fwctl_logging::{fwctl_debug, fwctl_info, fwctl_warn};

use crate::catalog::PackageInfo;
use crate::effect::{ClearLogRoute, DeviceCommand, Effect, LogTarget, TimerId, TimerPurpose};
use crate::error::DeviceError;
use crate::log_text::LogEntry;
use crate::log_view::{LogView, LogViewId};
use crate::presenter::Severity;
use crate::upload::{
    update_completion, upload_completion, Completion, ProgressProfile, SelectedFile, SessionId,
    UpdateState,
};
use crate::{AppState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => on_started(&mut state),
        Msg::FileSelected(file) => on_file_selected(&mut state, file),
        Msg::UploadClicked => on_upload_clicked(&mut state),
        Msg::UpdateClicked => on_update_clicked(&mut state),
        Msg::CancelClicked => on_cancel(&mut state),
        Msg::UploadProgressTick { session, increment } => {
            if state.upload.tick(session, increment) {
                state.mark_upload();
            }
            Vec::new()
        }
        Msg::UploadCompleted { session, result } => on_upload_completed(&mut state, session, result),
        Msg::UpdateProgressTick { session, increment } => {
            if state.update.tick(session, increment) {
                state.mark_update();
            }
            Vec::new()
        }
        Msg::UpdateCompleted { session, result } => on_update_completed(&mut state, session, result),
        Msg::CatalogRefreshRequested => vec![Effect::FetchCatalog],
        Msg::CatalogFetched(Ok(snapshot)) => {
            fwctl_debug!("catalog snapshot with {} package(s)", snapshot.len());
            state.catalog = Some(snapshot);
            state.mark_catalog();
            Vec::new()
        }
        Msg::CatalogFetched(Err(err)) => {
            // Keep showing the previous snapshot.
            fwctl_warn!("catalog refresh failed: {}", err);
            Vec::new()
        }
        Msg::PackageInfoRequested { filename } => vec![Effect::FetchPackageInfo { filename }],
        Msg::PackageInfoFetched { filename, result } => {
            on_package_info(&mut state, filename, result)
        }
        Msg::DeleteConfirmed { filename } => {
            fwctl_info!("deleting firmware package {}", filename);
            vec![Effect::DeletePackage { filename }]
        }
        Msg::DeleteCompleted { filename, result } => match result {
            Ok(_) => {
                state.notify(Severity::Success, format!("Firmware deleted: {filename}"));
                if state
                    .package_info
                    .as_ref()
                    .is_some_and(|info| info.filename == filename)
                {
                    state.package_info = None;
                    state.mark_package_info();
                }
                vec![Effect::FetchCatalog, refresh_all_logs(Duration::ZERO)]
            }
            Err(err) => {
                state.notify(
                    Severity::Error,
                    format!("Failed to delete firmware {filename}: {err}"),
                );
                Vec::new()
            }
        },
        Msg::LogRefreshRequested(view) => {
            if state.logs.contains_key(&view) {
                vec![fetch_log(view)]
            } else {
                Vec::new()
            }
        }
        Msg::LogPollDue { view, timer } => {
            let current = state.logs.get(&view).and_then(LogView::poll_timer);
            if current == Some(timer) {
                vec![fetch_log(view)]
            } else {
                fwctl_debug!("dropping poll from retired timer {:?} of {} log", timer, view);
                Vec::new()
            }
        }
        Msg::LogFetched { target, result } => on_log_fetched(&mut state, target, result),
        Msg::LogViewOpened(view) => on_log_view_opened(&mut state, view),
        Msg::LogViewClosed(view) => match state.logs.remove(&view) {
            Some(mut closed) => closed
                .stop_auto_refresh()
                .map(|timer| vec![Effect::StopTimer { timer }])
                .unwrap_or_default(),
            None => Vec::new(),
        },
        Msg::AutoRefreshToggled(view) => on_auto_refresh_toggled(&mut state, view),
        Msg::AutoScrollToggled(view) => {
            if let Some(log) = state.logs.get_mut(&view) {
                let enabled = log.toggle_auto_scroll();
                state.mark_log(view);
                if enabled {
                    state.notify(Severity::Success, "Auto-scroll enabled");
                } else {
                    state.notify(Severity::Info, "Auto-scroll disabled");
                }
            }
            Vec::new()
        }
        Msg::LogViewScrolled { view, offset_px } => {
            if let Some(log) = state.logs.get_mut(&view) {
                log.scroll_to(offset_px);
                state.mark_log(view);
            }
            Vec::new()
        }
        Msg::LogViewResized { view, viewport_px } => {
            if let Some(log) = state.logs.get_mut(&view) {
                log.resize(viewport_px);
                state.mark_log(view);
            }
            Vec::new()
        }
        Msg::ClearLogClicked(view) => {
            if !state.logs.contains_key(&view) {
                return (state, Vec::new());
            }
            let route = if view == LogViewId::MODAL {
                ClearLogRoute::Post
            } else {
                ClearLogRoute::Get
            };
            vec![Effect::ClearLog { view, route }]
        }
        Msg::LogCleared { view, result } => match result {
            Ok(_) => {
                state.notify(Severity::Success, "Log cleared");
                vec![fetch_log(view)]
            }
            Err(err) => {
                state.notify(Severity::Error, format!("Failed to clear log: {err}"));
                Vec::new()
            }
        },
        Msg::TelemetryPollDue => vec![Effect::FetchTelemetry],
        Msg::TelemetryFetched(Ok(telemetry)) => {
            if state.telemetry.as_ref() != Some(&telemetry) {
                state.telemetry = Some(telemetry);
                state.mark_telemetry();
            }
            Vec::new()
        }
        Msg::TelemetryFetched(Err(err)) => {
            fwctl_debug!("telemetry poll failed: {}", err);
            Vec::new()
        }
        Msg::DeviceCommandRequested(command) => vec![Effect::SendDeviceCommand(command)],
        Msg::DeviceCommandCompleted { command, result } => {
            on_device_command_completed(&mut state, command, result)
        }
    };

    (state, effects)
}

fn fetch_log(view: LogViewId) -> Effect {
    Effect::FetchLog {
        target: LogTarget::View(view),
        delay: Duration::ZERO,
    }
}

fn refresh_all_logs(delay: Duration) -> Effect {
    Effect::FetchLog {
        target: LogTarget::AllOpen,
        delay,
    }
}

fn start_log_timer(state: &mut AppState, view: LogViewId) -> Vec<Effect> {
    let timer = state.next_timer_id();
    let every = state.settings().log_poll_interval;
    let Some(log) = state.logs.get_mut(&view) else {
        return Vec::new();
    };
    let mut effects = Vec::with_capacity(2);
    if let Some(previous) = log.start_auto_refresh(timer) {
        effects.push(Effect::StopTimer { timer: previous });
    }
    effects.push(Effect::StartTimer {
        timer,
        every,
        purpose: TimerPurpose::LogPoll(view),
    });
    effects
}

fn on_started(state: &mut AppState) -> Vec<Effect> {
    let mut effects = vec![Effect::FetchCatalog, refresh_all_logs(Duration::ZERO)];
    if state.telemetry_timer.is_none() {
        let timer = state.next_timer_id();
        state.telemetry_timer = Some(timer);
        effects.push(Effect::FetchTelemetry);
        effects.push(Effect::StartTimer {
            timer,
            every: state.settings().telemetry_interval,
            purpose: TimerPurpose::Telemetry,
        });
    }
    let primary_idle = state
        .logs
        .get(&LogViewId::PRIMARY)
        .is_some_and(|log| log.poll_timer().is_none());
    if primary_idle {
        effects.extend(start_log_timer(state, LogViewId::PRIMARY));
        state.mark_log(LogViewId::PRIMARY);
    }
    effects
}

fn on_file_selected(state: &mut AppState, file: SelectedFile) -> Vec<Effect> {
    let mut effects = Vec::new();
    let session = state.next_session_id();
    if let Some(timer) = state.upload.ticker() {
        effects.push(Effect::StopTimer { timer });
    }
    let name = file.name.clone();
    let size = file.size();
    let size_kib = size as f64 / 1024.0;
    match state.upload.select(session, file) {
        Ok(()) => {
            fwctl_info!("firmware package selected: {} ({} bytes)", name, size);
            state.clear_last_error();
            state.upload_status = format!("Firmware Package selected: {name} ({size_kib:.1} KB)");
            state.notify(Severity::Info, format!("Firmware Package selected: {name}"));
        }
        Err(err) => {
            state.upload_status = "Please select a valid .bin file".to_string();
            state.reject(err);
        }
    }
    // A new selection invalidates any finished update result.
    if state.update.state() != UpdateState::Updating {
        let update_session = state.next_session_id();
        if let Some(timer) = state.update.reset(update_session) {
            effects.push(Effect::StopTimer { timer });
        }
        state.update_status.clear();
        state.mark_update();
    }
    state.mark_upload();
    effects
}

fn on_upload_clicked(state: &mut AppState) -> Vec<Effect> {
    let timer = state.next_timer_id();
    match state.upload.begin(timer) {
        Ok(file) => {
            let session = state.upload.id();
            fwctl_info!("uploading {} ({} bytes), session {}", file.name, file.size(), session);
            state.clear_last_error();
            state.upload_status = "Uploading firmware...".to_string();
            state.mark_upload();
            vec![
                Effect::StartTimer {
                    timer,
                    every: state.settings().upload_tick,
                    purpose: TimerPurpose::UploadProgress {
                        session,
                        max_step: ProgressProfile::UPLOAD.max_step,
                    },
                },
                Effect::UploadFirmware { session, file },
            ]
        }
        Err(err) => {
            state.reject(err);
            Vec::new()
        }
    }
}

fn on_upload_completed(
    state: &mut AppState,
    session: SessionId,
    result: Result<String, DeviceError>,
) -> Vec<Effect> {
    if !state.upload.accepts(session) {
        fwctl_debug!("discarding upload response for stale session {}", session);
        return Vec::new();
    }
    let completion = match &result {
        Ok(body) => upload_completion(body),
        Err(err) => Completion::Failed(err.to_string()),
    };
    let mut effects = Vec::new();
    if let Some(timer) = state.upload.finish(&completion) {
        effects.push(Effect::StopTimer { timer });
    }
    state.mark_upload();
    match completion {
        Completion::Succeeded => {
            fwctl_info!("upload session {} acknowledged by device", session);
            state.upload_status =
                "Firmware uploaded successfully! Ready to update the co-processor.".to_string();
            state.notify(Severity::Success, "Firmware uploaded successfully!");
            effects.push(Effect::ScheduleCatalogRefreshes {
                delays: state.settings().catalog_refresh_delays.clone(),
            });
            effects.push(refresh_all_logs(Duration::ZERO));
        }
        Completion::Rejected(body) => {
            fwctl_warn!("upload session {} rejected: {}", session, body);
            state.upload_status = format!("Firmware upload failed: {body}");
            state.notify(Severity::Error, format!("Firmware upload failed: {body}"));
            effects.push(refresh_all_logs(Duration::ZERO));
        }
        Completion::Failed(message) => {
            fwctl_warn!("upload session {} failed: {}", session, message);
            state.upload_status = format!("Upload failed: {message}");
            state.notify(Severity::Error, format!("Firmware upload failed: {message}"));
        }
    }
    effects
}

fn on_update_clicked(state: &mut AppState) -> Vec<Effect> {
    let session = state.next_session_id();
    let timer = state.next_timer_id();
    let upload_state = state.upload.state();
    match state.update.begin(upload_state, session, timer) {
        Ok(()) => {
            fwctl_info!("starting co-processor update, session {}", session);
            state.clear_last_error();
            state.update_status = "Starting firmware update...".to_string();
            state.mark_update();
            state.mark_upload();
            vec![
                Effect::StartTimer {
                    timer,
                    every: state.settings().update_tick,
                    purpose: TimerPurpose::UpdateProgress {
                        session,
                        max_step: ProgressProfile::UPDATE.max_step,
                    },
                },
                Effect::TriggerUpdate { session },
            ]
        }
        Err(err) => {
            state.reject(err);
            Vec::new()
        }
    }
}

fn on_update_completed(
    state: &mut AppState,
    session: SessionId,
    result: Result<String, DeviceError>,
) -> Vec<Effect> {
    if !state.update.accepts(session) {
        fwctl_debug!("discarding update response for stale session {}", session);
        return Vec::new();
    }
    let completion = match &result {
        Ok(body) => update_completion(body),
        Err(err) => Completion::Failed(err.to_string()),
    };
    let mut effects = Vec::new();
    if let Some(timer) = state.update.finish(&completion) {
        effects.push(Effect::StopTimer { timer });
    }
    state.mark_update();
    state.mark_upload();
    match completion {
        Completion::Succeeded => {
            fwctl_info!("co-processor update session {} completed", session);
            state.update_status = "Update successful! Device should reboot.".to_string();
            state.notify(Severity::Success, "Firmware update completed successfully!");
            effects.push(refresh_all_logs(Duration::ZERO));
        }
        Completion::Rejected(body) => {
            fwctl_warn!("co-processor update session {} failed: {}", session, body);
            state.update_status = format!("Firmware update failed: {body}");
            state.notify(Severity::Error, format!("Firmware update failed: {body}"));
            effects.push(refresh_all_logs(Duration::ZERO));
        }
        Completion::Failed(message) => {
            fwctl_warn!("co-processor update session {} errored: {}", session, message);
            state.update_status = format!("Update failed: {message}");
            state.notify(Severity::Error, format!("Firmware update failed: {message}"));
        }
    }
    effects
}

fn on_cancel(state: &mut AppState) -> Vec<Effect> {
    let upload_session = state.next_session_id();
    let update_session = state.next_session_id();
    let mut effects = Vec::new();
    if let Some(timer) = state.upload.cancel(upload_session) {
        effects.push(Effect::StopTimer { timer });
    }
    if let Some(timer) = state.update.reset(update_session) {
        effects.push(Effect::StopTimer { timer });
    }
    fwctl_info!("firmware workflow cancelled");
    state.clear_last_error();
    state.upload_status = "Update cancelled.".to_string();
    state.update_status.clear();
    state.notify(Severity::Info, "Update cancelled");
    state.mark_upload();
    state.mark_update();
    effects
}

fn on_package_info(
    state: &mut AppState,
    filename: String,
    result: Result<PackageInfo, DeviceError>,
) -> Vec<Effect> {
    match result {
        Ok(info) => {
            state.package_info = Some(info);
            state.mark_package_info();
        }
        Err(DeviceError::PackageNotFound { .. }) => {
            state.notify(
                Severity::Warning,
                format!("Firmware package not found: {filename}"),
            );
        }
        Err(err) => {
            state.notify(
                Severity::Error,
                format!("Failed to load firmware info for {filename}: {err}"),
            );
        }
    }
    Vec::new()
}

fn on_log_fetched(
    state: &mut AppState,
    target: LogTarget,
    result: Result<Vec<LogEntry>, DeviceError>,
) -> Vec<Effect> {
    let entries = match result {
        Ok(entries) => entries,
        Err(err) => {
            // Stale entries stay on screen.
            fwctl_warn!("log refresh failed: {}", err);
            return Vec::new();
        }
    };
    let targets: Vec<LogViewId> = match target {
        LogTarget::View(view) => vec![view],
        LogTarget::AllOpen => state.logs.keys().copied().collect(),
    };
    for view in targets {
        if let Some(log) = state.logs.get_mut(&view) {
            log.replace_entries(entries.clone());
            state.mark_log(view);
        }
    }
    Vec::new()
}

fn on_log_view_opened(state: &mut AppState, view: LogViewId) -> Vec<Effect> {
    let row_height = state.settings().log_row_height_px;
    state
        .logs
        .entry(view)
        .or_insert_with(|| LogView::new(view, row_height));
    state.mark_log(view);
    let mut effects = vec![fetch_log(view)];
    let idle = state
        .logs
        .get(&view)
        .is_some_and(|log| log.poll_timer().is_none());
    if idle {
        effects.extend(start_log_timer(state, view));
    }
    effects
}

fn on_auto_refresh_toggled(state: &mut AppState, view: LogViewId) -> Vec<Effect> {
    let Some(log) = state.logs.get_mut(&view) else {
        return Vec::new();
    };
    if log.auto_refresh() {
        let stopped: Option<TimerId> = log.stop_auto_refresh();
        state.mark_log(view);
        state.notify(Severity::Info, "Auto-refresh disabled");
        stopped
            .map(|timer| vec![Effect::StopTimer { timer }])
            .unwrap_or_default()
    } else {
        let effects = start_log_timer(state, view);
        state.mark_log(view);
        state.notify(Severity::Success, "Auto-refresh enabled");
        effects
    }
}

fn on_device_command_completed(
    state: &mut AppState,
    command: DeviceCommand,
    result: Result<String, DeviceError>,
) -> Vec<Effect> {
    match result {
        Ok(body) => {
            let body = body.trim();
            let text = if body.is_empty() {
                format!("{command} completed")
            } else {
                format!("{command}: {body}")
            };
            state.notify(Severity::Success, text);
            vec![refresh_all_logs(command.log_refresh_delay())]
        }
        Err(err) => {
            state.notify(Severity::Error, format!("{command} failed: {err}"));
            Vec::new()
        }
    }
}
