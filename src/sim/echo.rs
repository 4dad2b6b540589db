use std::io;
use std::thread::JoinHandle;
use std::time::Duration;

use sonar_echo::emitter::DEFAULT_TRIGGER_WIDTH_US;
use sonar_echo::{EchoState, Edge, SPEED_OF_SOUND_CM_PER_US};
use spin_sleep::SpinSleeper;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::{InstantClock, TriggerEvent};
use crate::config::SimulationSettings;

/// Simulated HC-SR04: answers each trigger pulse with an echo pulse whose
/// width encodes the next scripted obstacle distance.
///
/// Edges are delivered by calling [`EchoState::capture`] from the simulator
/// thread, the way the edge interrupt would on hardware.
#[derive(Debug)]
pub struct EchoSimulator {
    state: &'static EchoState,
    clock: InstantClock,
    distances_cm: Vec<f32>,
    response_delay: Duration,
    sleeper: SpinSleeper,
}

impl EchoSimulator {
    pub fn new(
        state: &'static EchoState,
        clock: InstantClock,
        settings: &SimulationSettings,
    ) -> Self {
        EchoSimulator {
            state,
            clock,
            distances_cm: settings.distances_cm.clone(),
            response_delay: Duration::from_micros(settings.response_delay_us),
            sleeper: SpinSleeper::new(100_000),
        }
    }

    /// Echo pulse width for an obstacle at `distance_cm`; `None` for a
    /// swallowed echo.
    pub fn echo_width(distance_cm: f32) -> Option<Duration> {
        if distance_cm < 0.0 {
            return None;
        }
        let us = (distance_cm * 2.0 / SPEED_OF_SOUND_CM_PER_US).round() as u64;
        Some(Duration::from_micros(us))
    }

    /// Start answering triggers on a dedicated thread.
    ///
    /// The thread ends when every sender of `triggers` is gone.
    pub fn spawn(
        self,
        triggers: mpsc::UnboundedReceiver<TriggerEvent>,
    ) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("echo-sim".into())
            .spawn(move || self.run(triggers))
    }

    fn run(self, mut triggers: mpsc::UnboundedReceiver<TriggerEvent>) {
        info!(
            scenario = ?self.distances_cm,
            response_delay_us = self.response_delay.as_micros() as u64,
            "Echo simulator started."
        );
        let mut script = self.distances_cm.iter().copied().cycle();

        while let Some(trigger) = triggers.blocking_recv() {
            // The sensor ignores pulses shorter than its minimum trigger width.
            if trigger.width_us < DEFAULT_TRIGGER_WIDTH_US as u64 {
                debug!(
                    at_us = trigger.at_us,
                    width_us = trigger.width_us,
                    "trigger too short, ignoring"
                );
                continue;
            }
            let Some(distance_cm) = script.next() else {
                trace!(?trigger, "empty scenario, ignoring trigger");
                continue;
            };
            let Some(width) = Self::echo_width(distance_cm) else {
                debug!(?trigger, "swallowing echo");
                continue;
            };

            self.sleeper.sleep(self.response_delay);
            self.state.capture(Edge::Rising, &self.clock);
            self.sleeper.sleep(width);
            self.state.capture(Edge::Falling, &self.clock);
            trace!(distance_cm, width_us = width.as_micros() as u64, "echo delivered");
        }

        info!("Trigger line closed, echo simulator exiting.");
    }
}
