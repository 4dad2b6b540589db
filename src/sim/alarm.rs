use core::convert::Infallible;
use std::time::Duration;

use sonar_echo::{AlarmTarget, DeadlineTimer};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

/// An armed timeout alarm.
#[derive(Debug)]
pub struct AlarmHandle {
    pub id: u64,
    task: AbortHandle,
}

impl AlarmHandle {
    /// Whether the alarm task has run to completion or was aborted.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// One-shot alarms backed by `tokio::time::sleep` tasks.
///
/// The timeout callback runs on a runtime worker, concurrently with the
/// polling ranging thread, which is the host equivalent of the timer
/// interrupt preempting the main loop.
#[derive(Debug, Clone)]
pub struct TokioAlarm {
    handle: Handle,
    next_id: u64,
}

impl TokioAlarm {
    pub fn new(handle: Handle) -> Self {
        TokioAlarm { handle, next_id: 0 }
    }
}

impl DeadlineTimer for TokioAlarm {
    type Alarm = AlarmHandle;
    type Error = Infallible;

    fn arm(&mut self, delay_ms: u32, target: AlarmTarget) -> Result<AlarmHandle, Infallible> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let task = self.handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
            target.fire();
            debug!(alarm = id, delay_ms, "timeout alarm fired");
        });
        trace!(alarm = id, delay_ms, "timeout alarm armed");

        Ok(AlarmHandle {
            id,
            task: task.abort_handle(),
        })
    }

    fn cancel(&mut self, alarm: AlarmHandle) {
        let fired = alarm.is_finished();
        // Aborting a finished task is a no-op and a task mid-fire is not waited
        // for; either way the target only ever flags the cycle it was armed for.
        alarm.task.abort();
        trace!(alarm = alarm.id, fired, "timeout alarm cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_echo::EchoState;

    fn leak_state() -> &'static EchoState {
        Box::leak(Box::new(EchoState::new()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_alarm_fires_once_after_delay() {
        let state = leak_state();
        let mut timer = TokioAlarm::new(Handle::current());

        let alarm = timer.arm(10, AlarmTarget::new(state)).unwrap();
        assert!(!state.timed_out());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(state.timed_out());
        assert!(alarm.is_finished());

        // Cancelling after the fact neither fails nor clears the flag.
        timer.cancel(alarm);
        assert!(state.timed_out());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_alarm_never_fires() {
        let state = leak_state();
        let mut timer = TokioAlarm::new(Handle::current());

        let alarm = timer.arm(30, AlarmTarget::new(state)).unwrap();
        timer.cancel(alarm);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!state.timed_out());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_alarm_ids_increase() {
        let state = leak_state();
        let mut timer = TokioAlarm::new(Handle::current());
        let a = timer.arm(1_000, AlarmTarget::new(state)).unwrap();
        let b = timer.arm(1_000, AlarmTarget::new(state)).unwrap();
        assert_eq!((a.id, b.id), (0, 1));
        timer.cancel(a);
        timer.cancel(b);
    }
}
