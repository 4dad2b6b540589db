//! Hardware seams of the ranger.
//!
//! The trigger pin and the trigger hold delay use the `embedded-hal` traits
//! (`OutputPin`, `DelayNs`). The monotonic clock and the one-shot alarm have
//! no `embedded-hal` counterpart and are defined here.

use crate::state::AlarmTarget;

/// Free-running microsecond clock used to stamp echo edges.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary fixed origin. Never goes backwards.
    fn now_us(&self) -> u64;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// One-shot alarm source.
///
/// `arm` schedules `target.fire()` to run once, `delay_ms` milliseconds from
/// now, in whatever asynchronous context the implementation uses.
pub trait DeadlineTimer {
    /// Handle identifying an armed alarm.
    type Alarm;
    /// Error raised when an alarm cannot be armed.
    type Error: core::fmt::Debug;

    /// Arm a one-shot alarm.
    fn arm(&mut self, delay_ms: u32, target: AlarmTarget) -> Result<Self::Alarm, Self::Error>;

    /// Cancel an alarm.
    ///
    /// Must be a no-op if the alarm already fired or was already cancelled,
    /// and must never clear a flag the alarm already raised. A callback that is
    /// already running may still complete after this returns; the
    /// [`AlarmTarget`] it holds keeps it from affecting any later cycle.
    fn cancel(&mut self, alarm: Self::Alarm);
}
