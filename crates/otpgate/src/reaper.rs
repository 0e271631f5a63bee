//! Reaper: periodic eviction of expired challenges.
//!
//! Purely memory hygiene. `verify` re-checks expiry itself, so a challenge
//! is never accepted late just because the reaper has not run yet. The
//! sweep goes through `ChallengeStore::evict_expired`, which takes each
//! identifier's lock before removing anything.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use otpgate_common::OtpError;

use crate::challenge::ChallengeStore;

/// Owned handle to a running reaper task
pub struct ReaperHandle {
    shutdown: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Stop the reaper and wait for it to exit.
    ///
    /// Fails with [`OtpError::Internal`] if the task panicked.
    pub async fn shutdown(mut self) -> Result<(), OtpError> {
        let _ = self.shutdown.send(());
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        task.await.map_err(|e| {
            tracing::error!(error = %e, "Reaper task failed");
            OtpError::Internal(format!("reaper task failed: {}", e))
        })
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the reaper on the current runtime
pub fn spawn(store: Arc<ChallengeStore>, interval: Duration) -> ReaperHandle {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(reaper_worker(store, interval, shutdown_rx));

    ReaperHandle {
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

async fn reaper_worker(
    store: Arc<ChallengeStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("🧹 Reaper started (interval: {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    tracing::info!(evicted = evicted, "Evicted expired challenges");
                } else {
                    tracing::debug!("Reaper sweep found nothing to evict");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("🧹 Reaper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{CodeGenerator, StoreConfig};
    use crate::clock::ManualClock;

    fn store(clock: Arc<ManualClock>) -> Arc<ChallengeStore> {
        Arc::new(ChallengeStore::new(StoreConfig::default(), CodeGenerator::default(), clock).unwrap())
    }

    #[tokio::test]
    async fn test_reaper_evicts_expired() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock.clone());
        store.issue("9876543210").await.unwrap();
        clock.advance(chrono::Duration::seconds(301));

        let handle = spawn(store.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio_test::assert_ok!(handle.shutdown().await);

        assert!(store.is_empty());
        assert_eq!(store.stats().evicted, 1);
    }

    #[tokio::test]
    async fn test_reaper_leaves_live_challenges() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock.clone());
        let issued = store.issue("9876543210").await.unwrap();

        let handle = spawn(store.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio_test::assert_ok!(handle.shutdown().await);

        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.verify("9876543210", &issued.code).await,
            crate::challenge::VerifyOutcome::Success { .. }
        ));
    }

    #[tokio::test]
    async fn test_shutdown_releases_store() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock);

        let handle = spawn(store.clone(), Duration::from_secs(300));
        assert_eq!(Arc::strong_count(&store), 2);

        tokio_test::assert_ok!(handle.shutdown().await);
        assert_eq!(Arc::strong_count(&store), 1);
    }

    #[tokio::test]
    async fn test_shutdown_reports_panicked_task() {
        let (shutdown, _) = broadcast::channel(1);
        let handle = ReaperHandle {
            shutdown,
            task: Some(tokio::spawn(async { panic!("sweep panicked") })),
        };

        let err = handle.shutdown().await.unwrap_err();
        assert!(matches!(err, OtpError::Internal(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let clock = Arc::new(ManualClock::default());
        let store = store(clock);

        drop(spawn(store.clone(), Duration::from_secs(300)));
        for _ in 0..100 {
            if Arc::strong_count(&store) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(Arc::strong_count(&store), 1);
    }
}
