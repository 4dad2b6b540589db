//! The polling main-loop side of a measurement cycle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cycle::{Phase, Step};
use crate::distance::{CycleResult, RangeLimits};
use crate::emitter::PulseEmitter;
use crate::error::RangingError;
use crate::hal::DeadlineTimer;
use crate::state::{AlarmTarget, EchoState};

/// Fixed timings of a measurement cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    /// Delay before the timeout alarm fires (ms).
    pub timeout_ms: u32,
    /// Pause after a cycle that received an echo (ms).
    pub settle_ms: u32,
    /// Width of the trigger pulse (µs).
    pub trigger_pulse_us: u32,
}

impl Default for CycleTiming {
    fn default() -> Self {
        CycleTiming {
            timeout_ms: 500,
            settle_ms: 400,
            trigger_pulse_us: 10,
        }
    }
}

/// Runs measurement cycles against one sensor.
///
/// Owns the trigger emitter and the alarm source; shares the [`EchoState`]
/// with whatever delivers the echo edge interrupts.
pub struct EchoRanger<P, D, T> {
    state: &'static EchoState,
    emitter: PulseEmitter<P, D>,
    timer: T,
    timeout_ms: u32,
    limits: RangeLimits,
}

impl<P, D, T> EchoRanger<P, D, T>
where
    P: OutputPin,
    D: DelayNs,
    T: DeadlineTimer,
{
    /// Create a ranger.
    ///
    /// The trigger line is driven low before this returns.
    pub fn new(
        state: &'static EchoState,
        pin: P,
        delay: D,
        timer: T,
        timing: CycleTiming,
        limits: RangeLimits,
    ) -> Result<Self, P::Error> {
        Ok(EchoRanger {
            state,
            emitter: PulseEmitter::with_width(pin, delay, timing.trigger_pulse_us)?,
            timer,
            timeout_ms: timing.timeout_ms,
            limits,
        })
    }

    /// The shared echo state this ranger polls.
    pub fn state(&self) -> &'static EchoState {
        self.state
    }

    /// Range limits used for classification.
    pub fn limits(&self) -> &RangeLimits {
        &self.limits
    }

    /// Run one full cycle: reset, trigger, arm, poll, cancel, classify.
    ///
    /// Returns once the falling edge was seen or the alarm fired. The alarm is
    /// always cancelled before returning, so no alarm of this cycle can reach
    /// into the next one.
    ///
    /// # Errors
    ///
    /// Returns `Err(RangingError::Trigger)` if the trigger pin fails and
    /// `Err(RangingError::Arm)` if the alarm cannot be armed. In both cases no
    /// alarm is left behind.
    pub fn run_cycle(&mut self) -> Result<CycleResult, RangingError<P::Error, T::Error>> {
        // Reset strictly before the trigger: stale edges of the previous
        // cycle must not complete this one, and edges of this cycle must not
        // be wiped.
        self.state.reset();

        self.emitter.emit().map_err(RangingError::Trigger)?;
        let mut phase = Phase::Idle.advance(Step::Trigger)?;

        let alarm = self
            .timer
            .arm(self.timeout_ms, AlarmTarget::new(self.state))
            .map_err(RangingError::Arm)?;
        phase = phase.advance(Step::Arm)?;

        while !phase.is_complete() {
            core::hint::spin_loop();
            phase = phase.advance(Step::Poll(self.state.snapshot()))?;
        }

        if phase == Phase::TimedOut {
            // The echo may have landed between reading `end` and reading the
            // flag.
            phase = phase.advance(Step::Poll(self.state.snapshot()))?;
        }

        self.timer.cancel(alarm);

        let outcome = phase.conclude(&self.limits)?;
        phase.advance(Step::Release)?;
        Ok(outcome)
    }

    /// Release the hardware.
    pub fn release(self) -> (P, D, T) {
        let (pin, delay) = self.emitter.release();
        (pin, delay, self.timer)
    }
}
