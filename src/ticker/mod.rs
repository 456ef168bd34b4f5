//! Streaming ticker session
//!
//! Owns the single streaming connection to the venue and fans channel
//! messages out to per-channel watchers:
//! - [`TickerSession`]: start/stop/reconnect and disconnect teardown
//! - [`ChannelWatcher`]: coalescing consumer task for one channel
//! - [`IdleWatchdog`]: forces a disconnect after prolonged silence
//! - [`Mailbox`]: single-slot, latest-value-wins queue
//!
//! The transport itself sits behind [`StreamConnector`] and
//! [`StreamConnection`]; see [`crate::ws`] for the SocketCluster one. An
//! in-process transport for tests lives in `loopback` behind the
//! `testing` feature.

#[cfg(any(test, feature = "testing"))]
pub mod loopback;
mod mailbox;
mod session;
mod watchdog;
mod watcher;

pub use mailbox::{Delivery, Mailbox};
pub use session::TickerSession;
pub use watchdog::{IdlePing, IdleWatchdog, DEFAULT_IDLE_TIMEOUT};
pub use watcher::ChannelWatcher;

use crate::ws::TransportError;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Called by the transport for every message on a subscribed channel.
/// Must not block.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Async tick callback driven by a [`ChannelWatcher`]
pub type TickHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Session errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// `start` called while a connection already exists
    #[error("Ticker already started")]
    AlreadyStarted,
}

/// Transport-level connection events, invoked from the transport's own
/// event loop
pub trait ConnectionListener: Send + Sync {
    fn on_connect(&self);
    fn on_error(&self, error: TransportError);
    fn on_disconnect(&self, error: Option<TransportError>);
}

/// One streaming connection
///
/// All methods are non-blocking; connection progress is reported through
/// the [`ConnectionListener`] given to [`StreamConnector::open`].
pub trait StreamConnection: Send + Sync {
    /// Begin connecting. No-op while connected or already connecting.
    fn connect(&self);
    /// Close the connection if open or opening
    fn disconnect(&self);
    fn is_connected(&self) -> bool;
    /// Ask the server for messages on `channel`
    fn subscribe(&self, channel: &str);
    /// Route messages for `channel` to `handler`, replacing any previous one
    fn on_channel(&self, channel: &str, handler: MessageHandler);
}

/// Factory for streaming connections
pub trait StreamConnector: Send + Sync {
    fn open(&self, listener: Arc<dyn ConnectionListener>) -> Arc<dyn StreamConnection>;
}

/// Session-level callbacks
///
/// Each call runs on its own task, outside the session lock, so
/// implementations may call back into the session.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_connect(&self) {}
    async fn on_error(&self, _error: TransportError) {}
    async fn on_disconnect(&self, _error: Option<TransportError>) {}
}

/// Wrap an async closure as a [`TickHandler`]
pub fn tick_handler<F, Fut>(f: F) -> TickHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move |value| Box::pin(f(value)))
}
