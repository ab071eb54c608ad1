use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use fwctl_core::{DeviceError, Effect, LogTarget, Msg};
use fwctl_logging::{fwctl_debug, fwctl_error, fwctl_info, fwctl_warn};

use crate::client::{DeviceClient, EngineSettings, ReqwestDeviceClient};
use crate::timers::{spawn_timer, TimerRegistry};

/// Where finished effects report back to. Returns `false` once nobody listens.
pub trait MsgSink: Send + Sync {
    fn send(&self, msg: Msg) -> bool;
}

/// Runs effects as tokio tasks. Must be driven from inside a runtime.
pub struct EffectExecutor {
    client: Arc<dyn DeviceClient>,
    sink: Arc<dyn MsgSink>,
    timers: TimerRegistry,
}

impl EffectExecutor {
    pub fn new(client: Arc<dyn DeviceClient>, sink: Arc<dyn MsgSink>) -> Self {
        Self {
            client,
            sink,
            timers: TimerRegistry::new(),
        }
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartTimer {
                timer,
                every,
                purpose,
            } => {
                let task = spawn_timer(timer, every, purpose, self.sink.clone());
                if self.timers.insert(timer, task) {
                    fwctl_warn!("timer {:?} restarted; previous task aborted", timer);
                }
            }
            Effect::StopTimer { timer } => {
                if !self.timers.stop(timer) {
                    fwctl_debug!("timer {:?} already stopped", timer);
                }
            }
            Effect::ScheduleCatalogRefreshes { delays } => {
                // Every delay gets its own fetch; later results overwrite earlier ones.
                for delay in delays {
                    self.spawn_delayed(delay, move |client| async move {
                        Msg::CatalogFetched(client.fetch_catalog().await)
                    });
                }
            }
            Effect::FetchCatalog => self.spawn(move |client| async move {
                Msg::CatalogFetched(client.fetch_catalog().await)
            }),
            Effect::FetchPackageInfo { filename } => self.spawn(move |client| async move {
                let result = client.fetch_package_info(&filename).await;
                Msg::PackageInfoFetched { filename, result }
            }),
            Effect::DeletePackage { filename } => self.spawn(move |client| async move {
                let result = client.delete_package(&filename).await;
                Msg::DeleteCompleted { filename, result }
            }),
            Effect::UploadFirmware { session, file } => {
                fwctl_info!("sending {} to device, session {}", file.name, session);
                self.spawn(move |client| async move {
                    let result = client.upload_firmware(&file).await;
                    Msg::UploadCompleted { session, result }
                })
            }
            Effect::TriggerUpdate { session } => self.spawn(move |client| async move {
                let result = client.trigger_update().await;
                Msg::UpdateCompleted { session, result }
            }),
            Effect::FetchLog { target, delay } => {
                self.spawn_delayed(delay, move |client| async move {
                    fetch_log(client.as_ref(), target).await
                })
            }
            Effect::ClearLog { view, route } => self.spawn(move |client| async move {
                let result = client.clear_log(route).await;
                Msg::LogCleared { view, result }
            }),
            Effect::FetchTelemetry => self.spawn(move |client| async move {
                Msg::TelemetryFetched(client.fetch_telemetry().await)
            }),
            Effect::SendDeviceCommand(command) => self.spawn(move |client| async move {
                let result = client.send_command(&command).await;
                Msg::DeviceCommandCompleted { command, result }
            }),
        }
    }

    fn spawn<F, Fut>(&self, request: F)
    where
        F: FnOnce(Arc<dyn DeviceClient>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Msg> + Send + 'static,
    {
        self.spawn_delayed(Duration::ZERO, request);
    }

    fn spawn_delayed<F, Fut>(&self, delay: Duration, request: F)
    where
        F: FnOnce(Arc<dyn DeviceClient>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Msg> + Send + 'static,
    {
        let client = self.client.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let msg = request(client).await;
            sink.send(msg);
        });
    }
}

async fn fetch_log(client: &dyn DeviceClient, target: LogTarget) -> Msg {
    let result = client.fetch_log().await;
    if let Err(err) = &result {
        fwctl_warn!("log fetch for {:?} failed: {}", target, err);
    }
    Msg::LogFetched { target, result }
}

enum EngineCommand {
    Execute(Effect),
    Shutdown,
}

/// Owns the tokio runtime thread that executes effects.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn MsgSink>) -> Result<Self, DeviceError> {
        let client = ReqwestDeviceClient::new(settings)?;
        fwctl_info!("device endpoint {}", client.base_url());
        Ok(Self::with_client(Arc::new(client), sink))
    }

    pub fn with_client(client: Arc<dyn DeviceClient>, sink: Arc<dyn MsgSink>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    fwctl_error!("failed to start engine runtime: {}", err);
                    return;
                }
            };
            {
                let _guard = runtime.enter();
                let mut executor = EffectExecutor::new(client, sink);
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Execute(effect) => executor.execute(effect),
                        EngineCommand::Shutdown => break,
                    }
                }
            }
            runtime.shutdown_timeout(Duration::from_millis(500));
        });

        Self { cmd_tx }
    }

    pub fn execute(&self, effect: Effect) {
        if self.cmd_tx.send(EngineCommand::Execute(effect)).is_err() {
            fwctl_warn!("engine thread is gone; effect dropped");
        }
    }

    pub fn execute_all(&self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Stops every timer and lets in-flight requests wind down.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}
