//! Reconnect supervisor
//!
//! Periodically re-opens a byte source that is not listening. The first
//! tick fires immediately, so spawning the supervisor also performs the
//! initial open.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ByteSource, TransportCallback};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

/// Default reopen poll period
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Cancellable periodic reopen task
pub struct ReconnectSupervisor {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    attempts: Arc<AtomicU64>,
}

impl ReconnectSupervisor {
    /// Spawn on the current tokio runtime
    #[instrument(
        name = "reconnect_supervisor_spawn",
        skip(source, callback),
        fields(source = %source.source_id(), interval_ms = interval.as_millis() as u64)
    )]
    pub fn spawn(
        source: Arc<dyn ByteSource>,
        callback: TransportCallback,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicU64::new(0));
        let task_attempts = attempts.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !source.is_listening() {
                            let attempt = task_attempts.fetch_add(1, Ordering::Relaxed) + 1;
                            if attempt > 1 {
                                info!(source = %source.source_id(), attempt, "reopening byte source");
                            }
                            source.listen(callback.clone());
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            source.stop();
            debug!(source = %source.source_id(), "reconnect supervisor stopped");
        });

        Self {
            shutdown_tx,
            handle,
            attempts,
        }
    }

    /// Number of `listen` calls issued so far (initial open included)
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Stop the supervisor and the source, waiting for the task to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
