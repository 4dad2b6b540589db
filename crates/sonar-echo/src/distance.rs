//! Echo width to distance conversion and range classification.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Speed of sound in centimeters per microsecond (343 m/s).
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

/// Converts an echo width to a one-way distance in centimeters.
///
/// The pulse covers the round trip, hence the division by two.
pub fn to_distance(elapsed_us: u64) -> f32 {
    (elapsed_us as f32 * SPEED_OF_SOUND_CM_PER_US) / 2.0
}

/// Inclusive band of distances the sensor can report reliably.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeLimits {
    /// Closest plausible distance (cm).
    pub min_cm: f32,
    /// Farthest plausible distance (cm).
    pub max_cm: f32,
}

impl RangeLimits {
    /// Construct a new band.
    pub const fn new(min_cm: f32, max_cm: f32) -> Self {
        RangeLimits { min_cm, max_cm }
    }

    /// Whether `cm` lies within `[min_cm, max_cm]`.
    pub fn contains(&self, cm: f32) -> bool {
        cm >= self.min_cm && cm <= self.max_cm
    }
}

impl Default for RangeLimits {
    /// The HC-SR04 datasheet band, 2 cm to 400 cm.
    fn default() -> Self {
        RangeLimits::new(2.0, 400.0)
    }
}

/// A timed echo and the distance it corresponds to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReading {
    /// Echo pulse width (µs).
    pub microseconds: u64,
    /// One-way distance (cm).
    pub centimeters: f32,
}

impl DistanceReading {
    /// Build a reading from an echo width.
    pub fn from_elapsed(microseconds: u64) -> Self {
        DistanceReading {
            microseconds,
            centimeters: to_distance(microseconds),
        }
    }
}

/// Outcome of one measurement cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleResult {
    /// Echo received and the distance is within the range limits.
    Measured(DistanceReading),
    /// Echo received but the distance is implausible.
    OutOfRange(DistanceReading),
    /// No falling edge before the deadline.
    Timeout,
    /// A falling edge arrived, but not after a rising edge of the same cycle.
    MalformedOrdering {
        /// Rising edge timestamp (µs), if one was seen.
        start: Option<u64>,
        /// Falling edge timestamp (µs).
        end: u64,
    },
}

impl CycleResult {
    /// Whether the driver loop should wait the settle delay before the next
    /// trigger. Only cycles that actually received an echo settle; a lost or
    /// garbled echo is retried immediately.
    pub fn settle_required(&self) -> bool {
        matches!(self, CycleResult::Measured(_) | CycleResult::OutOfRange(_))
    }

    /// The reading carried by this result, in range or not.
    pub fn reading(&self) -> Option<DistanceReading> {
        match self {
            CycleResult::Measured(r) | CycleResult::OutOfRange(r) => Some(*r),
            _ => None,
        }
    }
}

/// Classify an echo width against `limits`.
pub fn classify(elapsed_us: u64, limits: &RangeLimits) -> CycleResult {
    let reading = DistanceReading::from_elapsed(elapsed_us);
    if limits.contains(reading.centimeters) {
        CycleResult::Measured(reading)
    } else {
        CycleResult::OutOfRange(reading)
    }
}

/// Turn a completed echo into a cycle result.
///
/// `end` must be strictly after `start`; otherwise the edges do not describe a
/// pulse of this cycle and the result is [`CycleResult::MalformedOrdering`].
pub fn resolve_echo(start: Option<u64>, end: u64, limits: &RangeLimits) -> CycleResult {
    match start {
        Some(start) if end > start => classify(end - start, limits),
        _ => CycleResult::MalformedOrdering { start, end },
    }
}
