use std::fmt::Debug;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinSet;

use crate::utils::error::Result;

/// Detached jobs that outlive the request that started them.
/// Failures are logged here and never reach the caller.
#[derive(Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn<F, T>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Debug + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        while let Some(finished) = set.try_join_next() {
            Self::log_join(finished);
        }

        set.spawn(async move {
            tracing::info!("Starting background task: {}", name);
            match task.await {
                Ok(outcome) => tracing::info!("✅ {} finished: {:?}", name, outcome),
                Err(e) => tracing::error!("❌ {} failed: {}", name, e),
            }
        });
    }

    /// Tasks still running; finished ones are reaped first.
    pub fn in_flight(&self) -> usize {
        let mut set = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(finished) = set.try_join_next() {
            Self::log_join(finished);
        }
        set.len()
    }

    /// Waits for every task spawned so far.
    pub async fn drain(&self) {
        let mut set = {
            let mut guard = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };

        while let Some(finished) = set.join_next().await {
            Self::log_join(finished);
        }
    }

    fn log_join(finished: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = finished {
            tracing::error!("❌ Background task aborted: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::CatalogError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_spawned_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn("counter", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert!(tasks.in_flight() > 0);

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_not_in_flight() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("quick", async { Ok(()) });
        tasks.spawn("slow", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tasks.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_failing_task_does_not_affect_others() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        tasks.spawn("broken", async {
            Err::<(), _>(CatalogError::ValidationError {
                message: "boom".to_string(),
            })
        });
        let counter = done.clone();
        tasks.spawn("ok", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
