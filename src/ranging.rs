use std::time::{Duration, Instant};

use anyhow::Context;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use sonar_echo::{DeadlineTimer, EchoRanger, ReportSink};
use spin_sleep::SpinSleeper;
use tracing::{debug, info};

use crate::blackboard::{Blackboard, record};
use crate::bus::{CycleReport, Topic};

/// How the driver loop paces and bounds itself.
#[derive(Debug, Clone, Copy)]
pub struct LoopPolicy {
    /// Pause after a cycle that received an echo.
    pub settle: Duration,
    /// Stop after this many cycles; `None` runs forever.
    pub max_cycles: Option<u64>,
}

/// The control loop: trigger, wait, report, settle, repeat.
///
/// Blocking; run it on its own thread. Returns the number of cycles run once
/// `max_cycles` is reached. A hardware seam failure ends the loop with an
/// error; timeouts and bad readings never do.
pub fn run<P, D, T, S>(
    ranger: &mut EchoRanger<P, D, T>,
    sink: &mut S,
    topic: &Topic<CycleReport>,
    bb: &Blackboard,
    policy: LoopPolicy,
) -> anyhow::Result<u64>
where
    P: OutputPin,
    P::Error: Send + Sync + 'static,
    D: DelayNs,
    T: DeadlineTimer,
    T::Error: Send + Sync + 'static,
    S: ReportSink,
{
    info!(
        settle = ?policy.settle,
        max_cycles = ?policy.max_cycles,
        min_cm = ranger.limits().min_cm,
        max_cm = ranger.limits().max_cm,
        "Ranging loop started."
    );
    let sleeper = SpinSleeper::new(1_000);
    let mut cycle = 0;

    while policy.max_cycles.is_none_or(|max| cycle < max) {
        cycle += 1;
        let t0 = Instant::now();
        let result = ranger
            .run_cycle()
            .with_context(|| format!("measurement cycle {} failed", cycle))?;
        debug!(
            cycle,
            %result,
            cm = result.reading().map(|r| r.centimeters),
            alarm_fired = ranger.state().timed_out(),
            took = ?t0.elapsed(),
            "Cycle complete"
        );

        record(bb, &result);
        sink.report(&result);
        topic.publish(CycleReport {
            cycle,
            result,
            at: Instant::now(),
        });

        // Settle only after an echo; a lost echo is retried right away.
        if result.settle_required() {
            sleeper.sleep(policy.settle);
        }
    }

    info!(cycles = cycle, "Ranging loop finished.");
    Ok(cycle)
}
