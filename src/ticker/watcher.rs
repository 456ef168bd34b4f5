//! Per-channel coalescing consumer

use super::{Delivery, IdlePing, Mailbox, MessageHandler, TickHandler};
use crate::telemetry::{increment, increment_labeled, CounterMetric};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Consumer task bound to one subscribed channel
///
/// Network delivery writes into a single-slot [`Mailbox`]; the task drains
/// it and awaits the tick handler for each value in order, until stopped.
#[derive(Debug)]
pub struct ChannelWatcher {
    channel: String,
    mailbox: Arc<Mailbox<Value>>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ChannelWatcher {
    /// Spawn the consumer task for `channel`
    pub fn spawn(channel: impl Into<String>, on_tick: TickHandler) -> Self {
        let channel = channel.into();
        let mailbox = Arc::new(Mailbox::new());
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = {
            let channel = channel.clone();
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                tracing::info!(%channel, "Watcher started");
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut stop_rx => break,
                        payload = mailbox.pop() => on_tick(payload).await,
                    }
                }
                tracing::info!(%channel, "Watcher stopped");
            })
        };

        Self {
            channel,
            mailbox,
            stop_tx,
            task,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Message handler to register with the transport
    ///
    /// Stores each payload in the mailbox, replacing any value the consumer
    /// has not picked up yet, and resets the idle timer.
    pub fn handler(&self, idle: IdlePing) -> MessageHandler {
        let mailbox = self.mailbox.clone();
        let channel = self.channel.clone();
        Arc::new(move |payload: Value| {
            increment_labeled(CounterMetric::TicksReceived, &channel);
            if mailbox.push(payload) == Delivery::Replaced {
                tracing::trace!(%channel, "Dropped stale tick");
                increment(CounterMetric::TicksCoalesced);
            }
            idle.ping();
        })
    }

    /// Signal the consumer to exit and hand back its task
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop_tx.send(());
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::{tick_handler, IdleWatchdog};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    fn recording_watcher(channel: &str) -> (ChannelWatcher, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = ChannelWatcher::spawn(
            channel,
            tick_handler(move |value| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(value);
                }
            }),
        );
        (watcher, rx)
    }

    fn idle() -> (IdleWatchdog, IdlePing) {
        let watchdog = IdleWatchdog::spawn(Duration::from_secs(3600), || {});
        let ping = watchdog.pinger();
        (watchdog, ping)
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (watcher, mut rx) = recording_watcher("CANDLES--BINA-BTC_USDT--10");
        let (_watchdog, ping) = idle();
        let handler = watcher.handler(ping);

        handler(json!(1));
        assert_eq!(rx.recv().await, Some(json!(1)));
        handler(json!(2));
        assert_eq!(rx.recv().await, Some(json!(2)));

        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_burst_while_busy_delivers_latest() {
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = {
            let gate = gate.clone();
            ChannelWatcher::spawn(
                "test",
                tick_handler(move |value: Value| {
                    let tx = tx.clone();
                    let gate = gate.clone();
                    async move {
                        let first = value == json!("first");
                        let _ = tx.send(value);
                        if first {
                            gate.notified().await;
                        }
                    }
                }),
            )
        };
        let (_watchdog, ping) = idle();
        let handler = watcher.handler(ping);

        handler(json!("first"));
        assert_eq!(rx.recv().await, Some(json!("first")));

        // Consumer is parked inside the handler; these pile up
        handler(json!("a"));
        handler(json!("b"));
        handler(json!("c"));
        gate.notify_one();

        assert_eq!(rx.recv().await, Some(json!("c")));
        watcher.stop().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let (watcher, mut rx) = recording_watcher("test");
        let (_watchdog, ping) = idle();
        let handler = watcher.handler(ping);

        let task = watcher.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("watcher did not stop")
            .unwrap();

        handler(json!("late"));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channel_name() {
        let (watcher, _rx) = recording_watcher("CANDLES--BINA-ETH_USDT--60");
        assert_eq!(watcher.channel(), "CANDLES--BINA-ETH_USDT--60");
        watcher.stop().await.unwrap();
    }
}
