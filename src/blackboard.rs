use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use sonar_echo::{CycleResult, DistanceReading};

/// Running totals of the ranging loop.
#[derive(Debug, Clone)]
pub struct Stats {
    pub cycles: u64,
    pub measured: u64,
    pub out_of_range: u64,
    pub timeouts: u64,
    pub malformed: u64,
    /// Most recent in-range reading.
    pub last_reading: Option<DistanceReading>,
    pub last_cycle_ts: Option<Instant>,
    pub started: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            cycles: 0,
            measured: 0,
            out_of_range: 0,
            timeouts: 0,
            malformed: 0,
            last_reading: None,
            last_cycle_ts: None,
            started: Instant::now(),
        }
    }
}

impl Stats {
    /// Share of cycles that produced an in-range reading.
    pub fn hit_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.measured as f64 / self.cycles as f64
        }
    }
}

pub type Blackboard = Arc<RwLock<Stats>>;

pub fn snapshot(bb: &Blackboard) -> Stats {
    (*bb.read()).clone()
}

pub fn record(bb: &Blackboard, result: &CycleResult) {
    let mut g = bb.write();
    g.cycles += 1;
    g.last_cycle_ts = Some(Instant::now());
    match result {
        CycleResult::Measured(reading) => {
            g.measured += 1;
            g.last_reading = Some(*reading);
        }
        CycleResult::OutOfRange(_) => g.out_of_range += 1,
        CycleResult::Timeout => g.timeouts += 1,
        CycleResult::MalformedOrdering { .. } => g.malformed += 1,
    }
}
