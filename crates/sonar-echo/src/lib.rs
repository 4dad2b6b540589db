#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` echo-timing state machine for ultrasonic time-of-flight rangers."]
#![doc = ""]
#![doc = "The crate drives a trigger pulse, collects echo edge timestamps from an interrupt"]
#![doc = "context, guards each cycle with a one-shot deadline alarm and converts the echo"]
#![doc = "width to a distance. All hardware sits behind the traits in [`hal`]."]

pub mod cycle;
pub mod distance;
pub mod emitter;
pub mod error;
pub mod hal;
pub mod ranger;
pub mod report;
pub mod state;

pub use cycle::{Phase, Snapshot, Step};
pub use distance::{
    CycleResult, DistanceReading, RangeLimits, SPEED_OF_SOUND_CM_PER_US, classify, to_distance,
};
pub use emitter::PulseEmitter;
pub use error::{EchoError, RangingError};
pub use hal::{DeadlineTimer, MonotonicClock};
pub use ranger::{CycleTiming, EchoRanger};
pub use report::ReportSink;
pub use state::{AlarmTarget, Edge, EchoState};
