//! In-process transport
//!
//! Stands in for the venue's stream in tests and dry runs. Connection
//! events fire synchronously from the calling thread and messages are
//! injected with [`LoopbackConnection::publish`].

use super::{ConnectionListener, MessageHandler, StreamConnection, StreamConnector};
use crate::ws::TransportError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Connector handing out [`LoopbackConnection`]s. Clones share state.
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    opened: Arc<Mutex<Vec<Arc<LoopbackConnection>>>>,
    fail_connect: Arc<AtomicBool>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every connect attempt report an error instead of connecting
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Most recently opened connection
    pub fn last(&self) -> Option<Arc<LoopbackConnection>> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// Number of connections opened so far
    pub fn opened(&self) -> usize {
        self.opened.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl StreamConnector for LoopbackConnector {
    fn open(&self, listener: Arc<dyn ConnectionListener>) -> Arc<dyn StreamConnection> {
        let connection = Arc::new(LoopbackConnection {
            listener,
            fail_connect: self.fail_connect.clone(),
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
            handlers: Mutex::new(HashMap::new()),
        });
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(connection.clone());
        connection
    }
}

pub struct LoopbackConnection {
    listener: Arc<dyn ConnectionListener>,
    fail_connect: Arc<AtomicBool>,
    connected: AtomicBool,
    connects: AtomicUsize,
    subscriptions: Mutex<Vec<String>>,
    handlers: Mutex<HashMap<String, MessageHandler>>,
}

impl LoopbackConnection {
    /// Deliver `data` on `channel` the way the server would.
    /// Returns false when nothing was delivered.
    pub fn publish(&self, channel: &str, data: Value) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .cloned();
        match handler {
            Some(handler) => {
                handler(data);
                true
            }
            None => false,
        }
    }

    /// Simulate the server dropping the connection
    pub fn drop_connection(&self, error: Option<TransportError>) {
        self.connected.store(false, Ordering::SeqCst);
        self.listener.on_disconnect(error);
    }

    /// Successful connects so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Subscribe requests, in order
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl StreamConnection for LoopbackConnection {
    fn connect(&self) {
        if self.fail_connect.load(Ordering::SeqCst) {
            self.listener
                .on_error(TransportError::ConnectionFailed("loopback refused".into()));
            return;
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.listener.on_connect();
        }
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.listener.on_disconnect(None);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, channel: &str) {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(channel.to_string());
    }

    fn on_channel(&self, channel: &str, handler: MessageHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.to_string(), handler);
    }
}
