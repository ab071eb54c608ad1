//! fwctl engine: device HTTP client, timers and effect execution.
mod client;
mod engine;
mod timers;

pub use client::{DeviceClient, EngineSettings, ReqwestDeviceClient, UPLOAD_FIELD};
pub use engine::{EffectExecutor, EngineHandle, MsgSink};
pub use fwctl_core::{DeviceError, TransportKind};
pub use timers::{spawn_timer, TimerRegistry};
