//! WebSocket transport for the ticker
//!
//! A minimal SocketCluster client: handshake, channel subscribe, publish
//! routing and server keepalives. Reconnection policy lives in the ticker
//! session, not here.

mod client;
pub mod protocol;
mod types;

pub use client::{SocketClusterConnection, SocketClusterConnector};
pub use types::{TransportError, WsConfig, UPWINGO_WS_HOST, UPWINGO_WS_PORT};
