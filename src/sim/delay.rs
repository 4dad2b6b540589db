use std::time::Duration;

use embedded_hal::delay::DelayNs;
use spin_sleep::SpinSleeper;

/// Anything shorter than this is spun rather than slept.
const NATIVE_ACCURACY_NS: u32 = 100_000;

/// `DelayNs` with microsecond fidelity.
///
/// A 10 µs trigger hold is far below what an OS sleep can honour, so short
/// waits busy-spin.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay {
    sleeper: SpinSleeper,
}

impl SpinDelay {
    pub fn new() -> Self {
        SpinDelay {
            sleeper: SpinSleeper::new(NATIVE_ACCURACY_NS),
        }
    }
}

impl Default for SpinDelay {
    fn default() -> Self {
        SpinDelay::new()
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleeper.sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        self.sleeper.sleep(Duration::from_micros(us as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_delay_holds_at_least_requested_time() {
        let mut delay = SpinDelay::new();
        let t0 = Instant::now();
        delay.delay_us(10);
        assert!(t0.elapsed() >= Duration::from_micros(10));

        let t0 = Instant::now();
        delay.delay_ms(2);
        assert!(t0.elapsed() >= Duration::from_millis(2));
    }
}
