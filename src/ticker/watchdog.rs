//! Shared inactivity timer for a session's watchers

use crate::telemetry::{increment, CounterMetric};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

/// Silence tolerated across all channels before forcing a disconnect
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Cheap handle used by watchers to reset the idle timer
#[derive(Debug, Clone)]
pub struct IdlePing {
    tx: mpsc::Sender<()>,
}

impl IdlePing {
    /// Reset the timer without waiting. A ping already pending is enough,
    /// so a full channel is ignored.
    pub fn ping(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Inactivity watchdog task
///
/// Calls `on_idle` each time a full window passes without a ping. Dropping
/// the watchdog or calling [`IdleWatchdog::stop`] ends the task.
#[derive(Debug)]
pub struct IdleWatchdog {
    ping: IdlePing,
    stop_tx: oneshot::Sender<()>,
}

impl IdleWatchdog {
    /// Spawn the watchdog on the current runtime
    pub fn spawn<F>(window: Duration, on_idle: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (ping_tx, mut ping_rx) = mpsc::channel::<()>(1);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            tracing::debug!(window_secs = window.as_secs(), "Idle watchdog started");
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    ping = ping_rx.recv() => {
                        if ping.is_none() {
                            break;
                        }
                    }
                    _ = sleep(window) => {
                        tracing::warn!(window_secs = window.as_secs(), "Watchers idle, dropping connection");
                        increment(CounterMetric::IdleDisconnects);
                        on_idle();
                    }
                }
            }
            tracing::debug!("Idle watchdog stopped");
        });

        Self {
            ping: IdlePing { tx: ping_tx },
            stop_tx,
        }
    }

    /// Handle for resetting the timer
    pub fn pinger(&self) -> IdlePing {
        self.ping.clone()
    }

    /// Signal the task to exit
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}
