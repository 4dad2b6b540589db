//! Reporting sink interface.
//!
//! How a [`CycleResult`] is rendered is a presentation concern; the
//! [`core::fmt::Display`] implementation below is the canonical one-line form.

use core::fmt;

use crate::distance::CycleResult;

/// Consumer of cycle outcomes.
pub trait ReportSink {
    /// Handle one outcome. Called from the main loop, never from interrupt
    /// context.
    fn report(&mut self, result: &CycleResult);
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn report(&mut self, result: &CycleResult) {
        (**self).report(result)
    }
}

impl fmt::Display for CycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleResult::Measured(r) => write!(f, "Distance: {:.2} cm", r.centimeters),
            CycleResult::OutOfRange(_) => write!(f, "Out of range"),
            CycleResult::Timeout => write!(f, "Error: Timeout, no echo signal received"),
            CycleResult::MalformedOrdering { .. } => write!(f, "Error: Malformed echo ordering"),
        }
    }
}
