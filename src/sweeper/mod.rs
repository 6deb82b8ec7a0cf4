use crate::session::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

/// Background task that periodically purges idle sessions.
///
/// Runs independently of request traffic; a failed sweep is logged and
/// retried on the next tick, never fatal to the host process. Callers with
/// eviction disabled (TTL of zero) should simply not spawn it.
pub struct Sweeper;

/// Handle for stopping a running sweeper. Dropping it without calling
/// [`SweeperHandle::stop`] detaches the task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to exit and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl Sweeper {
    pub fn spawn(
        store: Arc<dyn SessionStore>,
        ttl: chrono::Duration,
        interval: Duration,
    ) -> SweeperHandle {
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick fires immediately; skip it so a freshly started
            // sweeper does not race startup traffic.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.evict_older_than(ttl, Utc::now()) {
                            Ok(removed) => {
                                tracing::debug!(removed, "sweep complete");
                            }
                            Err(e) => {
                                tracing::warn!("sweep failed, retrying next tick: {e}");
                            }
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });

        SweeperHandle { shutdown, task }
    }
}
