//! SocketCluster client over tokio-tungstenite

use super::protocol::{self, Frame};
use super::types::{TransportError, WsConfig};
use crate::ticker::{
    ConnectionListener, MessageHandler, StreamConnection, StreamConnector,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Opens [`SocketClusterConnection`]s against one endpoint
#[derive(Debug, Clone, Default)]
pub struct SocketClusterConnector {
    config: WsConfig,
}

impl SocketClusterConnector {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl StreamConnector for SocketClusterConnector {
    fn open(&self, listener: Arc<dyn ConnectionListener>) -> Arc<dyn StreamConnection> {
        Arc::new(SocketClusterConnection::new(self.config.clone(), listener))
    }
}

enum Command {
    Subscribe(String),
    Disconnect,
}

#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    running: AtomicBool,
    cid: AtomicU64,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

impl Shared {
    fn next_cid(&self) -> u64 {
        self.cid.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn handler(&self, channel: &str) -> Option<MessageHandler> {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .cloned()
    }

    fn send(&self, command: Command) -> bool {
        match &*self.commands.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    fn reset(&self) {
        self.connected.store(false, Ordering::SeqCst);
        *self.commands.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.running.store(false, Ordering::SeqCst);
    }
}

/// One SocketCluster connection
///
/// Each `connect` spawns a task that owns the socket until it closes.
/// Requests made while the handshake is in flight are queued and written
/// once it completes. Channel handlers survive reconnects.
pub struct SocketClusterConnection {
    config: WsConfig,
    listener: Arc<dyn ConnectionListener>,
    shared: Arc<Shared>,
}

impl SocketClusterConnection {
    pub fn new(config: WsConfig, listener: Arc<dyn ConnectionListener>) -> Self {
        Self {
            config,
            listener,
            shared: Arc::new(Shared::default()),
        }
    }

    async fn run(
        config: WsConfig,
        shared: Arc<Shared>,
        listener: Arc<dyn ConnectionListener>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) {
        tracing::info!(url = %config.url, "Connecting to ticker");

        let opened = match timeout(config.connect_timeout, connect_async(&config.url)).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::ConnectionFailed(e.to_string())),
            Err(_) => Err(TransportError::ConnectionFailed("Connect timed out".into())),
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Ticker connect failed");
                shared.reset();
                listener.on_error(e);
                return;
            }
        };

        let (mut write, read) = stream.split();
        let handshake = protocol::handshake(shared.next_cid());
        if let Err(e) = write.send(Message::Text(handshake)).await {
            shared.reset();
            listener.on_error(TransportError::SendFailed(e.to_string()));
            return;
        }

        tracing::info!("Ticker connected");
        shared.connected.store(true, Ordering::SeqCst);
        listener.on_connect();

        let result = Self::stream(&shared, &mut write, read, commands).await;
        match &result {
            Ok(()) => tracing::info!("Ticker connection closed"),
            Err(e) => tracing::warn!(error = %e, "Ticker connection lost"),
        }
        shared.reset();
        listener.on_disconnect(result.err());
    }

    async fn stream<W, R>(
        shared: &Shared,
        write: &mut W,
        mut read: R,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> Result<(), TransportError>
    where
        W: Sink<Message> + Unpin,
        W::Error: std::fmt::Display,
        R: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        let send_failed = |e: W::Error| TransportError::SendFailed(e.to_string());

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match protocol::parse(&text) {
                            Frame::Ping(reply) => {
                                write.send(Message::Text(reply.to_string())).await.map_err(send_failed)?;
                            }
                            Frame::Publish { channel, data } => match shared.handler(&channel) {
                                Some(handler) => handler(data),
                                None => tracing::trace!(%channel, "No handler for channel"),
                            },
                            Frame::Ack { rid, error: Some(error) } => {
                                tracing::warn!(rid, %error, "Request rejected");
                            }
                            Frame::Ack { rid, .. } => tracing::trace!(rid, "Request acknowledged"),
                            Frame::Event(event) => tracing::debug!(%event, "Unhandled event"),
                            Frame::Unknown => tracing::debug!(frame = %text, "Unparsed frame"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await.map_err(send_failed)?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(TransportError::ConnectionFailed(e.to_string())),
                        None => return Err(TransportError::StreamEnded),
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(Command::Subscribe(channel)) => {
                            tracing::info!(%channel, "Subscribing");
                            let frame = protocol::subscribe(&channel, shared.next_cid());
                            write.send(Message::Text(frame)).await.map_err(send_failed)?;
                        }
                        Some(Command::Disconnect) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

impl StreamConnection for SocketClusterConnection {
    fn connect(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Connect already in progress");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.commands.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);

        tokio::spawn(Self::run(
            self.config.clone(),
            self.shared.clone(),
            self.listener.clone(),
            rx,
        ));
    }

    fn disconnect(&self) {
        self.shared.send(Command::Disconnect);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, channel: &str) {
        if !self.shared.send(Command::Subscribe(channel.to_string())) {
            tracing::warn!(%channel, "Not connected, subscribe dropped");
        }
    }

    fn on_channel(&self, channel: &str, handler: MessageHandler) {
        self.shared
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.to_string(), handler);
    }
}
