//! Ticker session: one streaming connection shared by all watchers

use super::{
    ChannelWatcher, ConnectionListener, IdleWatchdog, SessionError, SessionListener,
    StreamConnection, StreamConnector, TickHandler,
};
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use crate::ws::TransportError;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Streaming session
///
/// Cheap to clone; clones share the same connection. The connection
/// handle, the watcher registry and the idle watchdog all live behind one
/// lock, and listener callbacks always run on their own tasks outside it.
#[derive(Clone)]
pub struct TickerSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    connector: Arc<dyn StreamConnector>,
    idle_timeout: Duration,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    connection: Option<Arc<dyn StreamConnection>>,
    /// Bumped on every start so events from a replaced connection are ignored
    generation: u64,
    watchers: HashMap<String, ChannelWatcher>,
    watchdog: Option<IdleWatchdog>,
}

impl SessionState {
    /// Take every watcher and the watchdog out of the registry
    fn drain(&mut self) -> (Vec<ChannelWatcher>, Option<IdleWatchdog>) {
        let watchers = self.watchers.drain().map(|(_, w)| w).collect();
        (watchers, self.watchdog.take())
    }
}

/// Signal each drained watcher exactly once
fn teardown(watchers: Vec<ChannelWatcher>, watchdog: Option<IdleWatchdog>) {
    if !watchers.is_empty() {
        tracing::info!(count = watchers.len(), "Stopping watchers");
    }
    for watcher in watchers {
        drop(watcher.stop());
    }
    if let Some(watchdog) = watchdog {
        watchdog.stop();
    }
    set_gauge(GaugeMetric::ActiveWatchers, 0.0);
}

impl TickerSession {
    /// Create an idle session over `connector`
    pub fn new(connector: Arc<dyn StreamConnector>, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                connector,
                idle_timeout,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Open the connection and start connecting
    ///
    /// Fails if the session already holds a connection.
    pub async fn start(&self, listener: Arc<dyn SessionListener>) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock().await;
        if state.connection.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        state.generation += 1;
        let events = Arc::new(SessionEvents {
            session: Arc::downgrade(&self.inner),
            generation: state.generation,
            listener,
        });
        let connection = self.inner.connector.open(events);
        state.connection = Some(connection.clone());
        connection.connect();

        tracing::info!(generation = state.generation, "Ticker started");
        Ok(())
    }

    /// Drop the connection and stop every watcher. Safe to call repeatedly.
    pub async fn stop(&self) {
        let (connection, watchers, watchdog) = {
            let mut state = self.inner.state.lock().await;
            let Some(connection) = state.connection.take() else {
                return;
            };
            let (watchers, watchdog) = state.drain();
            (connection, watchers, watchdog)
        };

        teardown(watchers, watchdog);
        connection.disconnect();
        tracing::info!("Ticker stopped");
    }

    /// Schedule a connect attempt after `timeout`
    ///
    /// Does nothing if the session was never started or is connected. The
    /// state is checked again once the delay has passed. Returns the handle
    /// of the scheduled attempt.
    pub async fn reconnect(&self, timeout: Duration) -> Option<JoinHandle<()>> {
        {
            let state = self.inner.state.lock().await;
            match &state.connection {
                Some(connection) if !connection.is_connected() => {}
                _ => return None,
            }
        }

        tracing::info!(timeout_secs = timeout.as_secs(), "Waiting to reconnect");
        let inner = self.inner.clone();
        Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let state = inner.state.lock().await;
            if let Some(connection) = &state.connection {
                if !connection.is_connected() {
                    tracing::info!("Reconnecting");
                    increment(CounterMetric::Reconnects);
                    connection.connect();
                }
            }
        }))
    }

    /// Subscribe to `channel` and feed its messages to `on_tick`
    ///
    /// A missing handler, a stopped or disconnected session, or a channel
    /// already watched leave the session untouched.
    pub async fn watch(&self, channel: &str, on_tick: Option<TickHandler>) {
        let Some(on_tick) = on_tick else {
            return;
        };

        let mut state = self.inner.state.lock().await;
        let Some(connection) = state.connection.clone() else {
            tracing::warn!(%channel, "Ticker not started, ignoring watch");
            return;
        };
        // A dead connection would swallow the subscribe; the next connect
        // installs the watcher instead
        if !connection.is_connected() {
            tracing::debug!(%channel, "Ticker not connected, ignoring watch");
            return;
        }
        if state.watchers.contains_key(channel) {
            tracing::debug!(%channel, "Channel already watched");
            return;
        }

        let idle = match &state.watchdog {
            Some(watchdog) => watchdog.pinger(),
            None => {
                let session = Arc::downgrade(&self.inner);
                let watchdog = IdleWatchdog::spawn(self.inner.idle_timeout, move || {
                    if let Some(inner) = session.upgrade() {
                        tokio::spawn(async move {
                            TickerSession { inner }.disconnect_idle().await;
                        });
                    }
                });
                let ping = watchdog.pinger();
                state.watchdog = Some(watchdog);
                ping
            }
        };

        let watcher = ChannelWatcher::spawn(channel, on_tick);
        connection.subscribe(channel);
        connection.on_channel(channel, watcher.handler(idle));
        state.watchers.insert(channel.to_string(), watcher);
        set_gauge(GaugeMetric::ActiveWatchers, state.watchers.len() as f64);
    }

    /// Whether the session holds a connection
    pub async fn is_started(&self) -> bool {
        self.inner.state.lock().await.connection.is_some()
    }

    /// Whether the held connection is live
    pub async fn is_connected(&self) -> bool {
        match &self.inner.state.lock().await.connection {
            Some(connection) => connection.is_connected(),
            None => false,
        }
    }

    /// Channels with an active watcher
    pub async fn watched_channels(&self) -> Vec<String> {
        let state = self.inner.state.lock().await;
        let mut channels: Vec<String> = state.watchers.keys().cloned().collect();
        channels.sort();
        channels
    }

    async fn disconnect_idle(&self) {
        let state = self.inner.state.lock().await;
        if let Some(connection) = &state.connection {
            if connection.is_connected() {
                connection.disconnect();
            }
        }
    }
}

/// Bridges transport events to the session listener
struct SessionEvents {
    session: Weak<SessionInner>,
    generation: u64,
    listener: Arc<dyn SessionListener>,
}

impl SessionEvents {
    async fn is_current(session: &Weak<SessionInner>, generation: u64) -> bool {
        match session.upgrade() {
            Some(inner) => inner.state.lock().await.generation == generation,
            None => false,
        }
    }
}

impl ConnectionListener for SessionEvents {
    fn on_connect(&self) {
        let session = self.session.clone();
        let generation = self.generation;
        let listener = self.listener.clone();
        tokio::spawn(async move {
            if !SessionEvents::is_current(&session, generation).await {
                tracing::debug!(generation, "Ignoring connect from replaced connection");
                return;
            }
            listener.on_connect().await;
        });
    }

    fn on_error(&self, error: TransportError) {
        let session = self.session.clone();
        let generation = self.generation;
        let listener = self.listener.clone();
        tokio::spawn(async move {
            if !SessionEvents::is_current(&session, generation).await {
                return;
            }
            listener.on_error(error).await;
        });
    }

    fn on_disconnect(&self, error: Option<TransportError>) {
        let session = self.session.clone();
        let generation = self.generation;
        let listener = self.listener.clone();
        tokio::spawn(async move {
            let Some(inner) = session.upgrade() else {
                return;
            };
            let drained = {
                let mut state = inner.state.lock().await;
                if state.generation != generation {
                    return;
                }
                state.drain()
            };
            teardown(drained.0, drained.1);
            listener.on_disconnect(error).await;
        });
    }
}
