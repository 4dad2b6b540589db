use std::sync::Arc;
use std::time::Duration;

use sonar_echo::{CycleResult, ReportSink};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::blackboard::{Blackboard, Stats, snapshot};
use crate::bus::CycleReport;

/// Prints each outcome on stdout and mirrors it into the log.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    lines: u64,
}

impl ConsoleSink {
    pub fn lines(&self) -> u64 {
        self.lines
    }
}

impl ReportSink for ConsoleSink {
    fn report(&mut self, result: &CycleResult) {
        match result {
            CycleResult::Measured(r) => {
                debug!(us = r.microseconds, cm = r.centimeters, "echo measured")
            }
            CycleResult::OutOfRange(r) => {
                info!(us = r.microseconds, cm = r.centimeters, "echo out of range")
            }
            CycleResult::Timeout => warn!("no echo before deadline"),
            CycleResult::MalformedOrdering { start, end } => {
                warn!(?start, end, "falling edge not after rising edge, reading dropped")
            }
        }
        println!("{}", result);
        self.lines += 1;
    }
}

fn log_summary(stats: &Stats) {
    info!(
        cycles = stats.cycles,
        measured = stats.measured,
        out_of_range = stats.out_of_range,
        timeouts = stats.timeouts,
        malformed = stats.malformed,
        hit_rate = stats.hit_rate(),
        last_cm = stats.last_reading.map(|r| r.centimeters),
        since_last = ?stats.last_cycle_ts.map(|t| t.elapsed()),
        uptime = ?stats.started.elapsed(),
        "Ranging summary"
    );
}

/// Follows the cycle topic and logs a periodic summary from the blackboard.
///
/// Returns once the topic is closed, i.e. the ranging loop has ended.
pub async fn monitor_task(
    mut rx: broadcast::Receiver<Arc<CycleReport>>,
    bb: Blackboard,
    interval: Duration,
) -> u64 {
    info!("Monitor task started.");
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    // The first tick completes immediately.
    ticker.tick().await;
    let mut seen = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => log_summary(&snapshot(&bb)),
            msg = rx.recv() => match msg {
                Ok(report) => {
                    seen += 1;
                    debug!(
                        cycle = report.cycle,
                        result = %report.result,
                        age = ?report.at.elapsed(),
                        "Cycle concluded"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Monitor lagged behind the ranging loop.");
                }
                Err(RecvError::Closed) => {
                    log_summary(&snapshot(&bb));
                    info!("Cycle topic closed. Monitor exiting.");
                    break;
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::record;
    use crate::bus::Topic;
    use sonar_echo::DistanceReading;
    use std::time::Instant;

    #[test]
    fn test_console_sink_counts_lines() {
        let mut sink = ConsoleSink::default();
        sink.report(&CycleResult::Measured(DistanceReading::from_elapsed(600)));
        sink.report(&CycleResult::Timeout);
        sink.report(&CycleResult::MalformedOrdering { start: Some(5), end: 4 });
        assert_eq!(sink.lines(), 3);
    }

    #[tokio::test]
    async fn test_monitor_exits_when_topic_closes() {
        let bb: Blackboard = Arc::default();
        let topic: Topic<CycleReport> = Topic::new(8);
        let rx = topic.subscribe();

        for cycle in 1..=3 {
            record(&bb, &CycleResult::Timeout);
            topic.publish(CycleReport {
                cycle,
                result: CycleResult::Timeout,
                at: Instant::now(),
            });
        }
        drop(topic);

        let seen = monitor_task(rx, bb.clone(), Duration::from_secs(60)).await;
        assert_eq!(seen, 3);
        assert_eq!(snapshot(&bb).timeouts, 3);
    }
}
