//! SocketCluster frame encoding
//!
//! Only the subset the ticker needs: handshake, subscribe, publish and the
//! two keepalive dialects (`#1`/`#2` and empty frames).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Server keepalive in the legacy dialect
const PING: &str = "#1";
/// Reply to [`PING`]
const PONG: &str = "#2";

/// Incoming frame, classified
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Keepalive; the payload is the reply to write back
    Ping(&'static str),
    /// Message published on a subscribed channel
    Publish { channel: String, data: Value },
    /// Response to one of our requests
    Ack { rid: u64, error: Option<Value> },
    /// Any other named event
    Event(String),
    /// Not a frame we understand
    Unknown,
}

#[derive(Debug, Serialize)]
struct Outgoing<'a> {
    event: &'a str,
    data: Value,
    cid: u64,
}

#[derive(Debug, Deserialize)]
struct Incoming {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    rid: Option<u64>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PublishData {
    channel: String,
    #[serde(default)]
    data: Value,
}

/// Opening handshake, sent once per connection
pub fn handshake(cid: u64) -> String {
    encode("#handshake", json!({ "authToken": null }), cid)
}

/// Channel subscription request
pub fn subscribe(channel: &str, cid: u64) -> String {
    encode("#subscribe", json!({ "channel": channel }), cid)
}

fn encode(event: &str, data: Value, cid: u64) -> String {
    let frame = Outgoing { event, data, cid };
    // Serializing a struct of strings and JSON values cannot fail
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Classify a text frame from the server
pub fn parse(text: &str) -> Frame {
    match text {
        PING => return Frame::Ping(PONG),
        "" => return Frame::Ping(""),
        _ => {}
    }

    let Ok(incoming) = serde_json::from_str::<Incoming>(text) else {
        return Frame::Unknown;
    };

    match (incoming.event, incoming.rid) {
        (Some(event), _) if event == "#publish" => {
            let Some(data) = incoming.data else {
                return Frame::Unknown;
            };
            match serde_json::from_value::<PublishData>(data) {
                Ok(publish) => Frame::Publish {
                    channel: publish.channel,
                    data: publish.data,
                },
                Err(_) => Frame::Unknown,
            }
        }
        (Some(event), _) => Frame::Event(event),
        (None, Some(rid)) => Frame::Ack {
            rid,
            error: incoming.error,
        },
        (None, None) => Frame::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_frame() {
        let frame: Value = serde_json::from_str(&handshake(1)).unwrap();
        assert_eq!(frame["event"], "#handshake");
        assert_eq!(frame["cid"], 1);
        assert!(frame["data"]["authToken"].is_null());
    }

    #[test]
    fn test_subscribe_frame() {
        let frame: Value =
            serde_json::from_str(&subscribe("CANDLES--BINA-BTC_USDT--10", 7)).unwrap();
        assert_eq!(frame["event"], "#subscribe");
        assert_eq!(frame["data"]["channel"], "CANDLES--BINA-BTC_USDT--10");
        assert_eq!(frame["cid"], 7);
    }

    #[test]
    fn test_parse_pings() {
        assert_eq!(parse("#1"), Frame::Ping("#2"));
        assert_eq!(parse(""), Frame::Ping(""));
    }

    #[test]
    fn test_parse_publish() {
        let text = r##"{"event":"#publish","data":{"channel":"CANDLES--BINA-BTC_USDT--10","data":[["100","1","1","1","1","1"]]}}"##;
        match parse(text) {
            Frame::Publish { channel, data } => {
                assert_eq!(channel, "CANDLES--BINA-BTC_USDT--10");
                assert_eq!(data[0][0], "100");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_parse_publish_without_channel() {
        let text = r##"{"event":"#publish","data":{"data":1}}"##;
        assert_eq!(parse(text), Frame::Unknown);
    }

    #[test]
    fn test_parse_ack() {
        let text = r#"{"rid":1,"data":{"id":"abc","pingTimeout":20000,"isAuthenticated":false}}"#;
        assert_eq!(parse(text), Frame::Ack { rid: 1, error: None });
    }

    #[test]
    fn test_parse_ack_with_error() {
        let text = r#"{"rid":3,"error":{"name":"BrokerError"}}"#;
        assert!(matches!(parse(text), Frame::Ack { rid: 3, error: Some(_) }));
    }

    #[test]
    fn test_parse_other_event() {
        let text = r##"{"event":"#setAuthToken","data":{}}"##;
        assert_eq!(parse(text), Frame::Event("#setAuthToken".to_string()));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse("not json"), Frame::Unknown);
        assert_eq!(parse("{}"), Frame::Unknown);
    }
}
