//! Ticker session over the loopback transport

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use upwingo_bot::ticker::loopback::LoopbackConnector;
use upwingo_bot::ticker::{
    tick_handler, SessionError, SessionListener, StreamConnection, TickHandler, TickerSession,
};
use upwingo_bot::ws::TransportError;

use crate::support::eventually;

#[derive(Default)]
struct Events {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

#[async_trait::async_trait]
impl SessionListener for Events {
    async fn on_connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }
    async fn on_disconnect(&self, _error: Option<TransportError>) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

fn recorder() -> (TickHandler, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = tick_handler(move |value| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(value);
        }
    });
    (handler, rx)
}

async fn started(idle: Duration) -> (TickerSession, LoopbackConnector, Arc<Events>) {
    let connector = LoopbackConnector::new();
    let session = TickerSession::new(Arc::new(connector.clone()), idle);
    let events = Arc::new(Events::default());
    session.start(events.clone()).await.unwrap();
    (session, connector, events)
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (session, connector, _events) = started(Duration::from_secs(120)).await;

    let err = session.start(Arc::new(Events::default())).await.unwrap_err();
    assert_eq!(err, SessionError::AlreadyStarted);
    assert_eq!(err.to_string(), "Ticker already started");
    assert_eq!(connector.opened(), 1);
}

#[tokio::test]
async fn test_channels_are_independent() {
    let (session, connector, _events) = started(Duration::from_secs(120)).await;
    let (h1, mut rx1) = recorder();
    let (h2, mut rx2) = recorder();
    session.watch("one", Some(h1)).await;
    session.watch("two", Some(h2)).await;

    let connection = connector.last().unwrap();
    connection.publish("one", json!(1));
    connection.publish("two", json!(2));
    connection.publish("one", json!(3));

    assert_eq!(rx1.recv().await, Some(json!(1)));
    assert_eq!(rx1.recv().await, Some(json!(3)));
    assert_eq!(rx2.recv().await, Some(json!(2)));
}

#[tokio::test]
async fn test_slow_consumer_sees_latest_only() {
    let (session, connector, _events) = started(Duration::from_secs(120)).await;
    let release = Arc::new(Notify::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

    let gate = release.clone();
    let handler = tick_handler(move |value: Value| {
        let tx = tx.clone();
        let gate = gate.clone();
        async move {
            let block = value == json!(0);
            let _ = tx.send(value);
            if block {
                gate.notified().await;
            }
        }
    });
    session.watch("busy", Some(handler)).await;
    let connection = connector.last().unwrap();

    connection.publish("busy", json!(0));
    assert_eq!(rx.recv().await, Some(json!(0)));

    for i in 1..=50 {
        connection.publish("busy", json!(i));
    }
    release.notify_one();

    assert_eq!(rx.recv().await, Some(json!(50)));
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_stops_every_watcher() {
    let (session, connector, events) = started(Duration::from_secs(120)).await;
    for channel in ["a", "b", "c"] {
        let (handler, _rx) = recorder();
        session.watch(channel, Some(handler)).await;
    }
    assert_eq!(session.watched_channels().await.len(), 3);

    connector
        .last()
        .unwrap()
        .drop_connection(Some(TransportError::StreamEnded));

    let s = &session;
    assert!(eventually(|| async move { s.watched_channels().await.is_empty() }).await);
    let e = &events;
    assert!(eventually(|| async move { e.disconnects.load(Ordering::SeqCst) == 1 }).await);

    // A fresh watch after teardown works again
    let (handler, _rx) = recorder();
    session.watch("a", Some(handler)).await;
    assert_eq!(session.watched_channels().await, vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_silence_forces_disconnect() {
    let (session, connector, events) = started(Duration::from_secs(60)).await;
    let (handler, _rx) = recorder();
    session.watch("quiet", Some(handler)).await;
    let connection = connector.last().unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(50)).await;
        connection.publish("quiet", json!("still here"));
    }
    assert!(connection.is_connected());

    tokio::time::sleep(Duration::from_secs(61)).await;
    let e = &events;
    assert!(eventually(|| async move { e.disconnects.load(Ordering::SeqCst) == 1 }).await);
    assert!(!connection.is_connected());
    assert!(session.is_started().await);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_recovers_connection() {
    let (session, connector, events) = started(Duration::from_secs(120)).await;
    let connection = connector.last().unwrap();
    connection.drop_connection(None);

    let handle = session.reconnect(Duration::from_secs(30)).await.unwrap();
    handle.await.unwrap();

    assert!(session.is_connected().await);
    assert_eq!(connection.connect_count(), 2);
    let e = &events;
    assert!(eventually(|| async move { e.connects.load(Ordering::SeqCst) == 2 }).await);
}
