use std::sync::Once;
use std::time::Duration;

use fwctl_core::{
    parse_log_entries, update, AppState, ClearLogRoute, DeviceCommand, DeviceError, Effect,
    LogTarget, LogViewId, Msg, TimerId, TimerPurpose, TransportKind,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(fwctl_logging::initialize_for_tests);
}

fn log_body(lines: usize) -> String {
    (0..lines).map(|i| format!("[{i}s] line {i}\n")).collect()
}

fn fetched(state: AppState, view: LogViewId, lines: usize) -> AppState {
    let (state, _) = update(
        state,
        Msg::LogFetched {
            target: LogTarget::View(view),
            result: Ok(parse_log_entries(&log_body(lines))),
        },
    );
    state
}

#[test]
fn startup_loads_everything_and_starts_pollers() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::Started);
    assert_eq!(
        effects,
        vec![
            Effect::FetchCatalog,
            Effect::FetchLog {
                target: LogTarget::AllOpen,
                delay: Duration::ZERO,
            },
            Effect::FetchTelemetry,
            Effect::StartTimer {
                timer: TimerId(1),
                every: Duration::from_secs(1),
                purpose: TimerPurpose::Telemetry,
            },
            Effect::StartTimer {
                timer: TimerId(2),
                every: Duration::from_secs(2),
                purpose: TimerPurpose::LogPoll(LogViewId::PRIMARY),
            },
        ]
    );
    assert_eq!(state.active_timers(), vec![TimerId(1), TimerId(2)]);
    assert_eq!(state.view().logs[0].auto_refresh_label, "ON (2s)");
}

#[test]
fn toggling_auto_refresh_never_leaks_timers() {
    init_logging();
    let mut state = AppState::new();
    let mut started = Vec::new();
    let mut stopped = Vec::new();
    for _ in 0..5 {
        let (next, effects) = update(state, Msg::AutoRefreshToggled(LogViewId::PRIMARY));
        state = next;
        for effect in effects {
            match effect {
                Effect::StartTimer { timer, .. } => started.push(timer),
                Effect::StopTimer { timer } => stopped.push(timer),
                other => panic!("unexpected effect {other:?}"),
            }
        }
        assert!(state.active_timers().len() <= 1);
    }

    assert_eq!(started, vec![TimerId(1), TimerId(2), TimerId(3)]);
    assert_eq!(stopped, vec![TimerId(1), TimerId(2)]);
    assert_eq!(state.active_timers(), vec![TimerId(3)]);
    assert!(state.log_view(LogViewId::PRIMARY).unwrap().auto_refresh());
}

#[test]
fn views_poll_independently() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::AutoRefreshToggled(LogViewId::PRIMARY));
    let (state, effects) = update(state, Msg::LogViewOpened(LogViewId::MODAL));
    assert_eq!(
        effects,
        vec![
            Effect::FetchLog {
                target: LogTarget::View(LogViewId::MODAL),
                delay: Duration::ZERO,
            },
            Effect::StartTimer {
                timer: TimerId(2),
                every: Duration::from_secs(2),
                purpose: TimerPurpose::LogPoll(LogViewId::MODAL),
            },
        ]
    );

    let (state, effects) = update(state, Msg::AutoRefreshToggled(LogViewId::PRIMARY));
    assert_eq!(effects, vec![Effect::StopTimer { timer: TimerId(1) }]);
    let modal = state.log_view(LogViewId::MODAL).unwrap();
    assert!(modal.auto_refresh());
    assert_eq!(modal.poll_timer(), Some(TimerId(2)));

    let (state, effects) = update(state, Msg::LogViewClosed(LogViewId::MODAL));
    assert_eq!(effects, vec![Effect::StopTimer { timer: TimerId(2) }]);
    assert!(state.active_timers().is_empty());
}

#[test]
fn polls_from_retired_timers_are_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::AutoRefreshToggled(LogViewId::PRIMARY));
    let (state, effects) = update(
        state,
        Msg::LogPollDue {
            view: LogViewId::PRIMARY,
            timer: TimerId(1),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchLog {
            target: LogTarget::View(LogViewId::PRIMARY),
            delay: Duration::ZERO,
        }]
    );

    let (state, _) = update(state, Msg::AutoRefreshToggled(LogViewId::PRIMARY));
    let (_, effects) = update(
        state,
        Msg::LogPollDue {
            view: LogViewId::PRIMARY,
            timer: TimerId(1),
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn auto_scroll_follows_only_from_bottom() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::LogViewResized {
            view: LogViewId::PRIMARY,
            viewport_px: 180.0,
        },
    );
    let state = fetched(state, LogViewId::PRIMARY, 20);
    let view = state.log_view(LogViewId::PRIMARY).unwrap();
    assert!(view.is_at_bottom());
    assert_eq!(view.scroll().offset_px, 20.0 * 18.0 - 180.0);

    let (state, _) = update(
        state,
        Msg::LogViewScrolled {
            view: LogViewId::PRIMARY,
            offset_px: 36.0,
        },
    );
    let state = fetched(state, LogViewId::PRIMARY, 40);
    let view = state.log_view(LogViewId::PRIMARY).unwrap();
    assert_eq!(view.scroll().offset_px, 36.0);
    assert_eq!(view.entries().len(), 40);

    let (state, _) = update(state, Msg::AutoScrollToggled(LogViewId::PRIMARY));
    let (state, _) = update(state, Msg::AutoScrollToggled(LogViewId::PRIMARY));
    let view = state.log_view(LogViewId::PRIMARY).unwrap();
    assert!(view.auto_scroll());
    assert!(view.is_at_bottom());
}

#[test]
fn failed_fetch_keeps_entries() {
    init_logging();
    let state = fetched(AppState::new(), LogViewId::PRIMARY, 3);
    let (state, _) = update(
        state,
        Msg::LogFetched {
            target: LogTarget::AllOpen,
            result: Err(DeviceError::transport(TransportKind::Network, "down")),
        },
    );
    assert_eq!(
        state.log_view(LogViewId::PRIMARY).unwrap().entries().len(),
        3
    );
}

#[test]
fn fetch_for_all_views_updates_each_open_view() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::LogViewOpened(LogViewId::MODAL));
    let (state, _) = update(
        state,
        Msg::LogFetched {
            target: LogTarget::AllOpen,
            result: Ok(parse_log_entries(&log_body(4))),
        },
    );
    for id in [LogViewId::PRIMARY, LogViewId::MODAL] {
        assert_eq!(state.log_view(id).unwrap().entries().len(), 4);
    }
}

#[test]
fn clear_uses_route_of_the_view() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ClearLogClicked(LogViewId::PRIMARY));
    assert_eq!(
        effects,
        vec![Effect::ClearLog {
            view: LogViewId::PRIMARY,
            route: ClearLogRoute::Get
        }]
    );
    let (state, _) = update(state, Msg::LogViewOpened(LogViewId::MODAL));
    let (state, effects) = update(state, Msg::ClearLogClicked(LogViewId::MODAL));
    assert_eq!(
        effects,
        vec![Effect::ClearLog {
            view: LogViewId::MODAL,
            route: ClearLogRoute::Post
        }]
    );

    let (_, effects) = update(
        state,
        Msg::LogCleared {
            view: LogViewId::MODAL,
            result: Ok("Log cleared".into()),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchLog {
            target: LogTarget::View(LogViewId::MODAL),
            delay: Duration::ZERO,
        }]
    );
}

#[test]
fn device_commands_refresh_log_after_their_delay() {
    init_logging();
    let command = DeviceCommand::I2cCommand { cmd: 0x42 };
    let (state, effects) = update(AppState::new(), Msg::DeviceCommandRequested(command.clone()));
    assert_eq!(effects, vec![Effect::SendDeviceCommand(command.clone())]);

    let (state, effects) = update(
        state,
        Msg::DeviceCommandCompleted {
            command,
            result: Ok("OK".into()),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchLog {
            target: LogTarget::AllOpen,
            delay: Duration::from_millis(500),
        }]
    );
    assert_eq!(state.notifications()[0].text, "I2C command 0x42: OK");
}
