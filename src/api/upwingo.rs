//! Upwingo REST client
//!
//! Thin wrapper over the v1 binary options endpoints. Every response body
//! carries an application `code`; anything other than 200 is an error even
//! when the HTTP status is fine.

use super::types::{ApiError, Balance, OrderReceipt, OrderRequest, Params};
use super::TradeApi;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Upwingo API base URL
pub const UPWINGO_API_URL: &str = "https://api.upwingo.com";

/// Configuration for the Upwingo client
#[derive(Debug, Clone)]
pub struct UpwingoConfig {
    /// Base URL for the REST API
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl UpwingoConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: UPWINGO_API_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Client for the Upwingo trade API
pub struct UpwingoClient {
    config: UpwingoConfig,
    client: Client,
}

impl UpwingoClient {
    /// Create a client; fails without an API key
    pub fn new(config: UpwingoConfig) -> Result<Self, ApiError> {
        if config.api_key.trim().is_empty() {
            return Err(ApiError::MissingKey);
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    async fn get(&self, uri: &str, params: Option<&Params>) -> Result<Value, ApiError> {
        self.request(Method::GET, uri, params).await
    }

    async fn post(&self, uri: &str, params: Option<&Params>) -> Result<Value, ApiError> {
        self.request(Method::POST, uri, params).await
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        params: Option<&Params>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), uri);
        tracing::debug!(%method, %url, "Upwingo request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.config.api_key);
        if let Some(params) = params {
            request = if method == Method::GET {
                request.query(params)
            } else {
                request.json(params)
            };
        }

        let body = request.send().await?.text().await?;

        let bad_response = || ApiError::BadResponse {
            uri: uri.to_string(),
            body: body.clone(),
        };
        let value: Value = serde_json::from_str(&body).map_err(|_| bad_response())?;
        let code = value
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(bad_response)?;

        if code != 200 {
            return Err(ApiError::Code {
                code,
                uri: uri.to_string(),
                body,
            });
        }

        Ok(value)
    }
}

/// Order ids come back as strings or numbers
fn order_id(data: Option<&Value>) -> String {
    match data.and_then(|d| d.get("order_id")) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(id) => id.to_string(),
            None => n.as_f64().map(|f| format!("{:.0}", f)).unwrap_or_default(),
        },
        _ => String::new(),
    }
}

#[async_trait]
impl TradeApi for UpwingoClient {
    async fn tables(&self) -> Result<Value, ApiError> {
        self.get("/v1/binary/tables", None).await
    }

    async fn next_round(&self, params: &Params) -> Result<Value, ApiError> {
        self.get("/v1/binary/round", Some(params)).await
    }

    async fn history(&self, params: &Params) -> Result<Value, ApiError> {
        self.get("/v1/binary/history", Some(params)).await
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ApiError> {
        let body = self.post("/v1/binary/order", Some(&order.params())).await?;

        let order_id = order_id(body.get("data"));
        if order_id.is_empty() {
            tracing::warn!(%body, "Order accepted without an id");
        }

        Ok(OrderReceipt {
            order_id,
            balance: Balance::from_value(body.get("balance").unwrap_or(&Value::Null)),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Balance, ApiError> {
        let uri = format!("/v1/binary/order/{}/cancel", order_id);
        let body = self.post(&uri, None).await?;
        Ok(Balance::from_value(body.get("balance").unwrap_or(&Value::Null)))
    }

    async fn balance(&self) -> Result<Balance, ApiError> {
        let body = self.get("/v1/balance", None).await?;
        Ok(Balance::from_value(body.get("data").unwrap_or(&Value::Null)))
    }
}
