//! Bounded concurrency for fan-out work such as topping up several topics.

use std::{future::Future, sync::Arc};

use futures::future::join_all;
use tokio::sync::Semaphore;

/// Runs futures with at most `limit` of them in flight.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl BoundedPool {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Run every task and return the outputs in input order.
    pub async fn run_all<I, F, T>(&self, tasks: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T>,
    {
        let gated = tasks.into_iter().map(|task| {
            let semaphore = self.semaphore.clone();
            async move {
                // The semaphore is never closed, so a permit always arrives
                let _permit = semaphore.acquire_owned().await.ok();
                task.await
            }
        });

        join_all(gated).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limits_in_flight_tasks() {
        let pool = BoundedPool::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..10).map(|i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        });

        let results = pool.run_all(tasks).await;

        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_still_runs() {
        let pool = BoundedPool::new(0);
        assert_eq!(pool.limit(), 1);
        let results = pool.run_all((0..3).map(|i| async move { i * 2 })).await;
        assert_eq!(results, vec![0, 2, 4]);
    }
}
