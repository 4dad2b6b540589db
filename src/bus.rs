use std::sync::Arc;
use std::time::Instant;

use sonar_echo::CycleResult;
use tokio::sync::broadcast;

/// One concluded cycle as published to subscribers.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle counter.
    pub cycle: u64,
    pub result: CycleResult,
    pub at: Instant,
}

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because we hop from the ranging thread onto the runtime.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscribers saw the message. Publishing with nobody
    /// listening is not an error; the message is just dropped.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}
