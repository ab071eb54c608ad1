use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fwctl_core::{Msg, TimerId, TimerPurpose};
use fwctl_logging::fwctl_trace;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::MsgSink;

/// Live timer tasks keyed by the id the core assigned them.
///
/// At most one task runs per id: inserting over an existing id aborts the old
/// task, and dropping the registry aborts everything.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` under `timer`; returns whether an older task was replaced.
    pub fn insert(&mut self, timer: TimerId, task: JoinHandle<()>) -> bool {
        match self.tasks.insert(timer, task) {
            Some(previous) => {
                previous.abort();
                true
            }
            None => false,
        }
    }

    pub fn stop(&mut self, timer: TimerId) -> bool {
        match self.tasks.remove(&timer) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }

    pub fn is_running(&self, timer: TimerId) -> bool {
        self.tasks
            .get(&timer)
            .is_some_and(|task| !task.is_finished())
    }

    /// Number of registered tasks that have not finished.
    pub fn live(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Spawns the repeating task behind `timer`. The first tick fires one period
/// after the start. Must be called inside a tokio runtime.
pub fn spawn_timer(
    timer: TimerId,
    every: Duration,
    purpose: TimerPurpose,
    sink: Arc<dyn MsgSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            fwctl_trace!("timer {:?} fired for {:?}", timer, purpose);
            if !sink.send(tick_message(timer, purpose)) {
                break;
            }
        }
    })
}

fn tick_message(timer: TimerId, purpose: TimerPurpose) -> Msg {
    match purpose {
        TimerPurpose::UploadProgress { session, max_step } => Msg::UploadProgressTick {
            session,
            increment: random_increment(max_step),
        },
        TimerPurpose::UpdateProgress { session, max_step } => Msg::UpdateProgressTick {
            session,
            increment: random_increment(max_step),
        },
        TimerPurpose::LogPoll(view) => Msg::LogPollDue { view, timer },
        TimerPurpose::Telemetry => Msg::TelemetryPollDue,
    }
}

fn random_increment(max_step: f32) -> f32 {
    if max_step > 0.0 {
        rand::thread_rng().gen_range(0.0..max_step)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwctl_core::LogViewId;

    #[test]
    fn increments_stay_below_max_step() {
        for _ in 0..200 {
            let step = random_increment(15.0);
            assert!((0.0..15.0).contains(&step));
        }
        assert_eq!(random_increment(0.0), 0.0);
    }

    #[test]
    fn log_ticks_carry_their_timer() {
        let msg = tick_message(TimerId(4), TimerPurpose::LogPoll(LogViewId::MODAL));
        assert_eq!(
            msg,
            Msg::LogPollDue {
                view: LogViewId::MODAL,
                timer: TimerId(4)
            }
        );
    }
}
