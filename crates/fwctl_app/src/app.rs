use std::fs;
use std::io::{self, BufRead, Stdout};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use fwctl_core::{update, AppState, LogViewId, Msg, Notification, Presenter, SelectedFile, Severity};
use fwctl_engine::DeviceError;
use fwctl_logging::{fwctl_info, fwctl_warn};

use crate::commands::{parse_line, Command, DeletePrompt, Routed, HELP};
use crate::config::AppConfig;
use crate::effects::{AppEvent, EffectRunner};
use crate::presenter::TerminalPresenter;

pub struct App {
    state: AppState,
    runner: EffectRunner,
    events: mpsc::Receiver<AppEvent>,
    events_tx: mpsc::Sender<AppEvent>,
    presenter: TerminalPresenter<Stdout>,
    prompt: DeletePrompt,
    log_viewport_px: f64,
}

impl App {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let (events_tx, events) = mpsc::channel();
        let runner = EffectRunner::new(config.engine_settings(), events_tx.clone())
            .context("failed to set up device client")?;
        Ok(Self {
            state: AppState::with_settings(config.core_settings()),
            runner,
            events,
            events_tx,
            presenter: TerminalPresenter::new(io::stdout()),
            prompt: DeletePrompt::default(),
            log_viewport_px: config.log_viewport_px(),
        })
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn render(&mut self) {
        self.state.render(&mut self.presenter);
    }

    /// Interactive mode: pollers run in the background, commands come from stdin.
    pub fn watch(mut self, firmware: Option<PathBuf>) -> anyhow::Result<()> {
        spawn_stdin_reader(self.events_tx.clone());
        self.dispatch(Msg::LogViewResized {
            view: LogViewId::PRIMARY,
            viewport_px: self.log_viewport_px,
        });
        self.dispatch(Msg::Started);
        if let Some(path) = firmware {
            self.select_file(&path);
        }
        self.render();

        let mut running = true;
        while running {
            let Ok(event) = self.events.recv() else {
                break;
            };
            running = self.handle_event(event);
            // Coalesce whatever else is already queued into one render.
            while running {
                match self.events.try_recv() {
                    Ok(event) => running = self.handle_event(event),
                    Err(_) => break,
                }
            }
            self.render();
        }

        fwctl_info!("leaving watch mode");
        self.runner.shutdown();
        Ok(())
    }

    /// Sends one request through the workflow and waits for its answer.
    pub fn run_once(mut self, request: Msg, timeout: Duration) -> anyhow::Result<()> {
        self.dispatch(request);
        let deadline = Instant::now() + timeout;
        let result = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match self.events.recv_timeout(remaining) {
                Ok(event) => event,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    break Err(anyhow!("device did not answer within {timeout:?}"))
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    break Err(anyhow!("engine stopped unexpectedly"))
                }
            };
            let AppEvent::Msg(msg) = event else {
                continue;
            };
            let outcome = completion_of(&msg);
            self.dispatch(msg);
            self.render();
            if let Some(outcome) = outcome {
                break outcome.map_err(anyhow::Error::from);
            }
        };
        self.runner.shutdown();
        result
    }

    fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Msg(msg) => {
                self.dispatch(msg);
                true
            }
            AppEvent::Input(line) => self.handle_line(&line),
            AppEvent::InputClosed => false,
        }
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return true,
            Err(err) => {
                self.presenter
                    .notify(&Notification::new(Severity::Warning, err.to_string()));
                return true;
            }
        };
        match self.prompt.route(command) {
            Routed::Run(Command::Select(path)) => self.select_file(&path),
            Routed::Run(Command::Send(msg)) => self.dispatch(msg),
            Routed::Run(Command::Help) => println!("{HELP}"),
            Routed::Run(Command::Quit) => return false,
            // The prompt consumes these itself.
            Routed::Run(Command::StageDelete(_) | Command::Confirm | Command::Decline) => {}
            Routed::Ask(question) => self
                .presenter
                .notify(&Notification::new(Severity::Warning, question)),
            Routed::Notice(text) => self
                .presenter
                .notify(&Notification::new(Severity::Info, text)),
        }
        true
    }

    fn select_file(&mut self, path: &Path) {
        match read_firmware(path) {
            Ok(file) => self.dispatch(Msg::FileSelected(file)),
            Err(err) => {
                fwctl_warn!("{:#}", err);
                self.presenter
                    .notify(&Notification::new(Severity::Error, format!("{err:#}")));
            }
        }
    }
}

fn read_firmware(path: &Path) -> anyhow::Result<SelectedFile> {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => bail!("{} does not name a file", path.display()),
    };
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(SelectedFile::new(name, bytes))
}

/// For one-shot requests: the answer that ends the wait.
fn completion_of(msg: &Msg) -> Option<Result<(), DeviceError>> {
    let result = match msg {
        Msg::CatalogFetched(result) => result.as_ref().map(|_| ()),
        Msg::PackageInfoFetched { result, .. } => result.as_ref().map(|_| ()),
        Msg::LogFetched { result, .. } => result.as_ref().map(|_| ()),
        Msg::TelemetryFetched(result) => result.as_ref().map(|_| ()),
        _ => return None,
    };
    Some(result.map_err(Clone::clone))
}

fn spawn_stdin_reader(tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(AppEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(AppEvent::InputClosed);
    });
}
