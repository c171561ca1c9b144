//! Non-blocking hand-off of records to a [`PersistenceStore`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{PersistenceStore, RewardRecord, SimulationRecord};

/// Default number of records that may wait for the worker.
pub const DEFAULT_CAPACITY: usize = 256;

/// A record waiting to be written.
#[derive(Debug, Clone)]
pub enum PersistenceJob {
    Simulation(Box<SimulationRecord>),
    Reward(RewardRecord),
}

impl PersistenceJob {
    fn id(&self) -> &str {
        match self {
            Self::Simulation(record) => &record.id,
            Self::Reward(record) => &record.id,
        }
    }
}

/// Fire-and-forget writer in front of a [`PersistenceStore`].
///
/// [`dispatch`](Self::dispatch) never waits: records go into a bounded
/// queue drained by a spawned worker task. A full queue, a stopped worker,
/// or a failed insert drops the record with a warning. The worker outlives
/// the request that dispatched the record.
#[derive(Debug, Clone)]
pub struct PersistenceSink {
    tx: mpsc::Sender<PersistenceJob>,
}

impl PersistenceSink {
    /// Spawns the worker on the current Tokio runtime.
    ///
    /// Returns the sink and the worker's handle; the worker exits once every
    /// clone of the sink has been dropped and the queue is drained.
    #[must_use]
    pub fn spawn(store: Arc<dyn PersistenceStore>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<PersistenceJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = match &job {
                    PersistenceJob::Simulation(record) => store.insert_simulation(record).await,
                    PersistenceJob::Reward(record) => store.insert_reward(record).await,
                };
                if let Err(e) = result {
                    log::warn!("Failed to persist record {}: {e}", job.id());
                }
            }
            log::debug!("Persistence worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Queues a simulation record. Returns whether it was accepted.
    pub fn dispatch_simulation(&self, record: SimulationRecord) -> bool {
        self.dispatch(PersistenceJob::Simulation(Box::new(record)))
    }

    /// Queues a reward record. Returns whether it was accepted.
    pub fn dispatch_reward(&self, record: RewardRecord) -> bool {
        self.dispatch(PersistenceJob::Reward(record))
    }

    /// Queues `job` without waiting. Returns whether it was accepted.
    pub fn dispatch(&self, job: PersistenceJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                log::warn!("Persistence queue full, dropping record {}", job.id());
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                log::warn!("Persistence worker stopped, dropping record {}", job.id());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::PersistenceError;
    use crate::tests::outcome;

    #[derive(Default)]
    struct Recording {
        simulations: Mutex<Vec<String>>,
        rewards: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PersistenceStore for Recording {
        async fn insert_simulation(&self, record: &SimulationRecord) -> Result<(), PersistenceError> {
            self.simulations.lock().unwrap().push(record.id.clone());
            Ok(())
        }

        async fn insert_reward(&self, record: &RewardRecord) -> Result<(), PersistenceError> {
            self.rewards.lock().unwrap().push(record.id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Failing {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PersistenceStore for Failing {
        async fn insert_simulation(&self, _: &SimulationRecord) -> Result<(), PersistenceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::Database("disk I/O error".to_string()))
        }

        async fn insert_reward(&self, _: &RewardRecord) -> Result<(), PersistenceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::Database("disk I/O error".to_string()))
        }
    }

    fn simulation() -> SimulationRecord {
        SimulationRecord::new(Some("user-1"), "block", 120.0, &outcome())
    }

    #[tokio::test]
    async fn dispatched_records_reach_the_store() {
        let store = Arc::new(Recording::default());
        let (sink, worker) = PersistenceSink::spawn(store.clone(), 8);

        let sim = simulation();
        let reward = RewardRecord::pending(Some("user-1"), "wallet", 10);
        assert!(sink.dispatch_simulation(sim.clone()));
        assert!(sink.dispatch_reward(reward.clone()));

        drop(sink);
        worker.await.unwrap();

        assert_eq!(*store.simulations.lock().unwrap(), vec![sim.id]);
        assert_eq!(*store.rewards.lock().unwrap(), vec![reward.id]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let store = Arc::new(Recording::default());
        let (sink, worker) = PersistenceSink::spawn(store.clone(), 1);

        // The current-thread test runtime does not run the worker until we
        // yield, so only the first record fits.
        assert!(sink.dispatch_simulation(simulation()));
        assert!(!sink.dispatch_simulation(simulation()));
        assert!(!sink.dispatch_simulation(simulation()));

        drop(sink);
        worker.await.unwrap();
        assert_eq!(store.simulations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_failures_are_absorbed() {
        let store = Arc::new(Failing::default());
        let (sink, worker) = PersistenceSink::spawn(store.clone(), 8);

        assert!(sink.dispatch_simulation(simulation()));
        assert!(sink.dispatch_reward(RewardRecord::pending(None, "wallet", 1)));

        drop(sink);
        worker.await.unwrap();
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stopped_worker_rejects_dispatch() {
        let store = Arc::new(Recording::default());
        let (sink, worker) = PersistenceSink::spawn(store, 8);
        worker.abort();
        let _ = worker.await;

        assert!(!sink.dispatch_simulation(simulation()));
    }
}
