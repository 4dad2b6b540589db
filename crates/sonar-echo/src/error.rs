//! Error types for the echo-timing crate.
//!
//! Cycle outcomes such as a timeout or an implausible distance are not errors;
//! they are reported through [`crate::CycleResult`]. The types here cover
//! misuse of the cycle state machine and failures of the hardware seams.

use core::fmt;

use crate::cycle::Phase;

/// Errors raised by the cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EchoError {
    /// A step was applied in a phase that does not accept it.
    Unexpected {
        /// Phase the machine was in when the step arrived.
        phase: Phase,
    },
}

impl fmt::Display for EchoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoError::Unexpected { phase } => {
                write!(f, "Unexpected step in phase {:?}", phase)
            }
        }
    }
}

impl core::error::Error for EchoError {}

/// Errors returned by [`crate::EchoRanger::run_cycle`].
///
/// `PE` is the trigger pin error, `TE` the deadline timer error.
#[derive(Debug, Clone, PartialEq)]
pub enum RangingError<PE, TE> {
    /// Driving the trigger pin failed.
    Trigger(PE),
    /// Arming the timeout alarm failed.
    Arm(TE),
    /// The cycle state machine was driven out of order.
    Cycle(EchoError),
}

impl<PE, TE> From<EchoError> for RangingError<PE, TE> {
    fn from(err: EchoError) -> Self {
        RangingError::Cycle(err)
    }
}

impl<PE: fmt::Debug, TE: fmt::Debug> fmt::Display for RangingError<PE, TE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangingError::Trigger(e) => write!(f, "Trigger pin failure: {:?}", e),
            RangingError::Arm(e) => write!(f, "Failed to arm timeout alarm: {:?}", e),
            RangingError::Cycle(e) => write!(f, "Cycle state machine error: {}", e),
        }
    }
}

impl<PE: fmt::Debug, TE: fmt::Debug> core::error::Error for RangingError<PE, TE> {}
