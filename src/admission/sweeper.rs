//! Background expiry sweep for the counter store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::store::CounterStore;

/// Owned handle to the periodic sweep task.
///
/// Whoever constructs the controller starts the sweep and owns the handle;
/// the task lives exactly as long as the handle does. [`Sweeper::shutdown`]
/// stops it gracefully, dropping the handle aborts it.
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweep task on the current tokio runtime.
    ///
    /// The first sweep runs one full `interval` after startup.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero; [`AdmissionConfig`] validation rejects
    /// that before it reaches this point.
    ///
    /// [`AdmissionConfig`]: crate::config::AdmissionConfig
    pub fn start(store: Arc<dyn CounterStore>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The interval's first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep(Instant::now()).await;
                        if removed > 0 {
                            debug!(removed, "Swept expired rate limit counters");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Stop the sweep task and wait for it to exit.
    pub async fn shutdown(mut self) {
        info!("Stopping counter sweep task");
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
