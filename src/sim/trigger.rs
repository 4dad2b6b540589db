use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use sonar_echo::MonotonicClock;
use tokio::sync::mpsc;
use tracing::trace;

use super::InstantClock;

/// Falling edge of the trigger pulse, as seen by the simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Time the trigger went low (µs).
    pub at_us: u64,
    /// How long the trigger was held high (µs).
    pub width_us: u64,
}

/// Trigger output wired to the simulated sensor.
#[derive(Debug)]
pub struct SimTrigger {
    clock: InstantClock,
    high_since: Option<u64>,
    tx: mpsc::UnboundedSender<TriggerEvent>,
}

impl SimTrigger {
    pub fn new(clock: InstantClock) -> (Self, mpsc::UnboundedReceiver<TriggerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SimTrigger {
                clock,
                high_since: None,
                tx,
            },
            rx,
        )
    }
}

impl ErrorType for SimTrigger {
    type Error = Infallible;
}

impl OutputPin for SimTrigger {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if let Some(rose) = self.high_since.take() {
            let at_us = self.clock.now_us();
            let event = TriggerEvent {
                at_us,
                width_us: at_us.saturating_sub(rose),
            };
            trace!(?event, "trigger pulse");
            // A sensor that is no longer listening just misses the pulse.
            let _ = self.tx.send(event);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if self.high_since.is_none() {
            self.high_since = Some(self.clock.now_us());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SpinDelay;
    use sonar_echo::PulseEmitter;

    #[test]
    fn test_only_falling_edge_notifies() {
        let (mut pin, mut rx) = SimTrigger::new(InstantClock::new());
        pin.set_low().unwrap();
        assert!(rx.try_recv().is_err());

        pin.set_high().unwrap();
        pin.set_high().unwrap();
        assert!(rx.try_recv().is_err());

        pin.set_low().unwrap();
        assert!(rx.try_recv().is_ok());
        // Already low: no second pulse.
        pin.set_low().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emitter_pulse_width() {
        let (pin, mut rx) = SimTrigger::new(InstantClock::new());
        let mut emitter = PulseEmitter::new(pin, SpinDelay::new()).unwrap();
        emitter.emit().unwrap();

        let event = rx.try_recv().unwrap();
        assert!(event.width_us >= 10, "{:?}", event);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_not_an_error() {
        let (mut pin, rx) = SimTrigger::new(InstantClock::new());
        drop(rx);
        pin.set_high().unwrap();
        assert_eq!(pin.set_low(), Ok(()));
    }
}
