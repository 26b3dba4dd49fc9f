//! Per-evaluation concurrency control.
//!
//! Ensures only one turn runs per evaluation at a time — two concurrent
//! `process_turn` calls for the same `evaluation_id` would otherwise corrupt
//! the sliding window.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each evaluation key maps to a `Semaphore(1)`. Acquiring the permit
/// ensures exclusive access for one turn at a time; the permit is released
/// automatically (including on error) when it's dropped.
pub struct EvaluationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for EvaluationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for an evaluation. Waits if a turn for the same
    /// evaluation is already in flight.
    pub async fn acquire(&self, evaluation_id: &str) -> Result<OwnedSemaphorePermit, EvaluationBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(evaluation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| EvaluationBusy)
    }

    /// Number of tracked evaluations (for monitoring).
    pub fn evaluation_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Remove locks for evaluations that aren't actively held.
    ///
    /// Keyed on `Arc::strong_count` rather than `available_permits`: a
    /// caller in `acquire` that has cloned the `Arc` out of the map but
    /// hasn't finished `acquire_owned().await` yet still shows
    /// `available_permits() == 1` (uncontended) even though a permit is
    /// about to be taken. Pruning on permit count alone could drop the
    /// entry out from under that caller, so a second caller for the same
    /// `evaluation_id` would insert a fresh `Semaphore(1)` and acquire it
    /// immediately — two live permits for one evaluation. Strong count stays
    /// above 1 for the whole window the clone is alive, including while the
    /// acquire is in flight or a permit is held, so it's safe to prune only
    /// when the map's own reference is the last one.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}

/// Error returned when an evaluation's lock cannot be acquired (the
/// semaphore was closed — only happens at process shutdown).
#[derive(Debug)]
pub struct EvaluationBusy;

impl std::fmt::Display for EvaluationBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evaluation lock unavailable")
    }
}

impl std::error::Error for EvaluationBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = EvaluationLockMap::new();

        let permit1 = map.acquire("e1").await.unwrap();
        drop(permit1);

        let permit2 = map.acquire("e1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_evaluations_concurrent() {
        let map = Arc::new(EvaluationLockMap::new());

        let p1 = map.acquire("e1").await.unwrap();
        let p2 = map.acquire("e2").await.unwrap();

        assert_eq!(map.evaluation_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_evaluation_waits() {
        let map = Arc::new(EvaluationLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("e1").await.unwrap();

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("e1").await.unwrap();
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(p1);

        let result = handle.await.unwrap();
        assert_eq!(result, 42);
    }
}
