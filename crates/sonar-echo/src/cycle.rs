//! The measurement cycle as an explicit state machine.
//!
//! ```text
//! Idle --Trigger--> Triggered --Arm--> AwaitingEcho --Poll--> EchoComplete
//!                                           |                     |
//!                                           +--Poll--> TimedOut   |
//!                                                         |       |
//!  Idle <--------------------Release----------------------+-------+
//! ```
//!
//! Polling always looks at the echo first: a snapshot carrying an `end`
//! timestamp completes the cycle even if the timeout flag is also set, and a
//! `TimedOut` cycle still becomes `EchoComplete` if a later snapshot shows
//! the echo.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distance::{CycleResult, RangeLimits, resolve_echo};
use crate::error::EchoError;

/// One read of the shared cycle state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Rising edge timestamp (µs).
    pub start: Option<u64>,
    /// Falling edge timestamp (µs).
    pub end: Option<u64>,
    /// Whether the timeout alarm has fired.
    pub timed_out: bool,
}

/// Phase of the active measurement cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No cycle in progress.
    #[default]
    Idle,
    /// Trigger pulse emitted, alarm not yet armed.
    Triggered,
    /// Alarm armed, waiting for the falling edge or the deadline.
    AwaitingEcho,
    /// Falling edge observed.
    EchoComplete {
        /// Rising edge timestamp (µs), if one was seen.
        start: Option<u64>,
        /// Falling edge timestamp (µs).
        end: u64,
    },
    /// Deadline passed without a falling edge.
    TimedOut,
}

/// Inputs that move a cycle between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The trigger pulse was emitted.
    Trigger,
    /// The timeout alarm was armed.
    Arm,
    /// The main loop read the shared state.
    Poll(Snapshot),
    /// The alarm was cancelled and the cycle handed back.
    Release,
}

impl Phase {
    /// Apply `step`.
    ///
    /// # Errors
    ///
    /// Returns `Err(EchoError::Unexpected)` if the phase does not accept the
    /// step.
    pub fn advance(self, step: Step) -> Result<Phase, EchoError> {
        match (self, step) {
            (Phase::Idle, Step::Trigger) => Ok(Phase::Triggered),
            (Phase::Triggered, Step::Arm) => Ok(Phase::AwaitingEcho),
            (Phase::AwaitingEcho | Phase::TimedOut, Step::Poll(snap)) => Ok(match snap.end {
                Some(end) => Phase::EchoComplete {
                    start: snap.start,
                    end,
                },
                None if snap.timed_out => Phase::TimedOut,
                None => self,
            }),
            (Phase::EchoComplete { .. }, Step::Poll(_)) => Ok(self),
            (Phase::EchoComplete { .. } | Phase::TimedOut, Step::Release) => Ok(Phase::Idle),
            (phase, _) => Err(EchoError::Unexpected { phase }),
        }
    }

    /// Whether the cycle has concluded and only awaits release.
    pub fn is_complete(&self) -> bool {
        matches!(self, Phase::EchoComplete { .. } | Phase::TimedOut)
    }

    /// The result of a concluded cycle, `None` while it is still running.
    pub fn outcome(&self, limits: &RangeLimits) -> Option<CycleResult> {
        match *self {
            Phase::EchoComplete { start, end } => Some(resolve_echo(start, end, limits)),
            Phase::TimedOut => Some(CycleResult::Timeout),
            _ => None,
        }
    }

    /// The result of a concluded cycle.
    ///
    /// # Errors
    ///
    /// Returns `Err(EchoError::Unexpected)` if the cycle is still running.
    pub fn conclude(&self, limits: &RangeLimits) -> Result<CycleResult, EchoError> {
        self.outcome(limits).ok_or(EchoError::Unexpected { phase: *self })
    }
}
