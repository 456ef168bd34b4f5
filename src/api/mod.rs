//! Venue API
//!
//! The bot sees the venue through two capabilities: [`TradeApi`] for
//! request/response calls and a [`StreamConnector`] for the live ticker.
//! [`VenueApi`] bundles both and is built once at startup.

mod types;
mod upwingo;

pub use types::{ApiError, Balance, Direction, OrderReceipt, OrderRequest, Params};
pub use upwingo::{UpwingoClient, UpwingoConfig, UPWINGO_API_URL};

use crate::config::{Config, ExecutionMode};
use crate::execution::PaperTrade;
use crate::ticker::StreamConnector;
use crate::ws::{SocketClusterConnector, WsConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Request/response side of the venue
#[async_trait]
pub trait TradeApi: Send + Sync {
    /// Available tables, raw
    async fn tables(&self) -> Result<Value, ApiError>;
    /// Next round info for a table, raw
    async fn next_round(&self, params: &Params) -> Result<Value, ApiError>;
    /// Order history, raw
    async fn history(&self, params: &Params) -> Result<Value, ApiError>;
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ApiError>;
    async fn cancel_order(&self, order_id: &str) -> Result<Balance, ApiError>;
    async fn balance(&self) -> Result<Balance, ApiError>;
}

/// Capabilities handed to the orchestrator
#[derive(Clone)]
pub struct VenueApi {
    pub trade: Arc<dyn TradeApi>,
    pub ticker: Arc<dyn StreamConnector>,
}

impl VenueApi {
    pub fn new(trade: Arc<dyn TradeApi>, ticker: Arc<dyn StreamConnector>) -> Self {
        Self { trade, ticker }
    }

    /// Build the capability set for the configured execution mode
    ///
    /// Paper mode trades against an in-memory balance but still streams
    /// live candles.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let trade: Arc<dyn TradeApi> = match config.execution.mode {
            ExecutionMode::Paper => Arc::new(PaperTrade::new(
                &config.bot.currency,
                config.execution.paper_balance,
            )),
            ExecutionMode::Live => {
                let upwingo = UpwingoConfig::new(config.api.api_key.clone())
                    .base_url(config.api.base_url.clone());
                Arc::new(UpwingoClient::new(upwingo)?)
            }
        };

        let ws = WsConfig::socketcluster(&config.api.ws_host, config.api.ws_port);
        let ticker = Arc::new(SocketClusterConnector::new(ws));

        Ok(Self { trade, ticker })
    }
}
