//! Host stand-ins for the sensor hardware.
//!
//! The edge interrupt and the timer interrupt become threads and runtime
//! tasks that call into the shared [`sonar_echo::EchoState`] exactly as the
//! interrupt handlers would on a board.

mod alarm;
mod clock;
mod delay;
mod echo;
mod trigger;

pub use alarm::TokioAlarm;
pub use clock::InstantClock;
pub use delay::SpinDelay;
pub use echo::EchoSimulator;
pub use trigger::{SimTrigger, TriggerEvent};
