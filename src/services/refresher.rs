//! Pool refresh service
//!
//! Populates the proxy pool at startup and repopulates it on a fixed interval, independent
//! of the lazy refresh performed during selection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument};

use crate::proxy::ProxyPool;

/// Pool refresh service
pub struct PoolRefresher {
    pool: Arc<ProxyPool>,
    interval: Duration,
}

impl PoolRefresher {
    pub fn new(pool: Arc<ProxyPool>) -> Self {
        let interval = pool.config().refresh_interval;
        Self { pool, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the shutdown signal flips to true
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting pool refresher (interval: {}s)",
            self.interval.as_secs()
        );

        // Initial refresh on startup
        self.pool.refresh().await;

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.pool.refresh().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Pool refresher shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Handle for stopping the pool refresher
pub struct PoolRefresherHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl PoolRefresherHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for PoolRefresherHandle {
    fn default() -> Self {
        Self::new().0
    }
}
