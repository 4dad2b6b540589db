//! Trigger pulse generation.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Minimum trigger width accepted by HC-SR04 class sensors, in microseconds.
pub const DEFAULT_TRIGGER_WIDTH_US: u32 = 10;

/// Drives the sensor's trigger line.
pub struct PulseEmitter<P, D> {
    pin: P,
    delay: D,
    width_us: u32,
}

impl<P: OutputPin, D: DelayNs> PulseEmitter<P, D> {
    /// Create an emitter with the default 10 µs pulse.
    ///
    /// The trigger line is driven low so every pulse starts from a known level.
    pub fn new(pin: P, delay: D) -> Result<Self, P::Error> {
        Self::with_width(pin, delay, DEFAULT_TRIGGER_WIDTH_US)
    }

    /// Create an emitter with a custom pulse width.
    pub fn with_width(mut pin: P, delay: D, width_us: u32) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(PulseEmitter {
            pin,
            delay,
            width_us,
        })
    }

    /// Pulse width in microseconds.
    pub fn width_us(&self) -> u32 {
        self.width_us
    }

    /// Emit one trigger pulse: high, hold, low.
    ///
    /// The hold relies on `D` being a precise (busy-wait class) delay.
    pub fn emit(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()?;
        self.delay.delay_us(self.width_us);
        self.pin.set_low()
    }

    /// Release the pin and delay.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Trace {
        High,
        Low,
        Wait(u32),
    }

    type Log = Rc<RefCell<Vec<Trace>>>;

    struct TracePin(Log);

    impl ErrorType for TracePin {
        type Error = Infallible;
    }

    impl OutputPin for TracePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(Trace::Low);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(Trace::High);
            Ok(())
        }
    }

    struct TraceDelay(Log);

    impl DelayNs for TraceDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Trace::Wait(ns / 1_000));
        }

        fn delay_us(&mut self, us: u32) {
            self.0.borrow_mut().push(Trace::Wait(us));
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Broken;

    impl embedded_hal::digital::Error for Broken {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = Broken;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Broken> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Broken> {
            Err(Broken)
        }
    }

    #[test]
    fn test_new_drives_pin_low() {
        let log: Log = Rc::default();
        let emitter = PulseEmitter::new(TracePin(log.clone()), TraceDelay(log.clone())).unwrap();
        assert_eq!(emitter.width_us(), 10);
        assert_eq!(*log.borrow(), vec![Trace::Low]);
    }

    #[test]
    fn test_emit_sequence() {
        let log: Log = Rc::default();
        let mut emitter =
            PulseEmitter::new(TracePin(log.clone()), TraceDelay(log.clone())).unwrap();
        log.borrow_mut().clear();

        emitter.emit().unwrap();
        assert_eq!(*log.borrow(), vec![Trace::High, Trace::Wait(10), Trace::Low]);
    }

    #[test]
    fn test_custom_width() {
        let log: Log = Rc::default();
        let mut emitter =
            PulseEmitter::with_width(TracePin(log.clone()), TraceDelay(log.clone()), 25).unwrap();
        emitter.emit().unwrap();
        assert!(log.borrow().contains(&Trace::Wait(25)));
    }

    #[test]
    fn test_pin_error_propagates() {
        let log: Log = Rc::default();
        let mut emitter = PulseEmitter::new(BrokenPin, TraceDelay(log.clone())).unwrap();
        assert_eq!(emitter.emit(), Err(Broken));
        // The hold never started.
        assert!(log.borrow().is_empty());
    }
}
