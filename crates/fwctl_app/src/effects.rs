use std::sync::{mpsc, Arc};

use fwctl_core::{Effect, Msg};
use fwctl_engine::{DeviceError, EngineHandle, EngineSettings, MsgSink};
use fwctl_logging::{fwctl_debug, fwctl_info};

/// Everything the main loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Msg(Msg),
    Input(String),
    InputClosed,
}

struct EventSink {
    tx: mpsc::Sender<AppEvent>,
}

impl MsgSink for EventSink {
    fn send(&self, msg: Msg) -> bool {
        self.tx.send(AppEvent::Msg(msg)).is_ok()
    }
}

/// Hands effects from the core to the engine thread.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, tx: mpsc::Sender<AppEvent>) -> Result<Self, DeviceError> {
        let engine = EngineHandle::new(settings, Arc::new(EventSink { tx }))?;
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::UploadFirmware { session, file } => {
                    fwctl_info!(
                        "UploadFirmware session={} file={} bytes={}",
                        session,
                        file.name,
                        file.size()
                    );
                }
                Effect::TriggerUpdate { session } => {
                    fwctl_info!("TriggerUpdate session={}", session);
                }
                Effect::DeletePackage { filename } => {
                    fwctl_info!("DeletePackage filename={}", filename);
                }
                other => fwctl_debug!("effect {:?}", other),
            }
            self.engine.execute(effect);
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}
