//! Configuration types for upwingo-bot

use crate::api::UPWINGO_API_URL;
use crate::telemetry::LogFormat;
use crate::ws::{UPWINGO_WS_HOST, UPWINGO_WS_PORT};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Configuration used when no file is found
pub const DEFAULT_CONFIG: &str = include_str!("../config.toml.example");

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Venue endpoints and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bearer token for the REST API
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ws_host")]
    pub ws_host: String,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

fn default_base_url() -> String {
    UPWINGO_API_URL.to_string()
}
fn default_ws_host() -> String {
    UPWINGO_WS_HOST.to_string()
}
fn default_ws_port() -> u16 {
    UPWINGO_WS_PORT
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            ws_host: default_ws_host(),
            ws_port: default_ws_port(),
        }
    }
}

/// Which bot to run
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Print every tick
    Simple,
    /// Candle trend reversal
    #[default]
    Trend,
}

/// Bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Candle source exchange code
    #[serde(default = "default_exchange")]
    pub exchange: String,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Candle period in seconds
    #[serde(default = "default_timeframe")]
    pub timeframe: i64,

    /// Table the orders go to
    #[serde(default)]
    pub table_id: String,

    /// Stake per order
    #[serde(default = "default_amount")]
    pub amount: Decimal,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Reconnect after errors and disconnects
    #[serde(default = "default_true")]
    pub reconnect: bool,

    #[serde(default = "default_reconnect_timeout")]
    pub reconnect_timeout_secs: u64,

    /// Periods kept in the candle window
    #[serde(default = "default_window")]
    pub window: usize,

    /// Depth at which a run of bars counts as a trend
    #[serde(default = "default_trend_index")]
    pub trend_index: usize,
}

fn default_exchange() -> String {
    "BINA".to_string()
}
fn default_symbol() -> String {
    "BTC_USDT".to_string()
}
fn default_timeframe() -> i64 {
    10
}
fn default_amount() -> Decimal {
    Decimal::ONE
}
fn default_currency() -> String {
    "USDT".to_string()
}
fn default_true() -> bool {
    true
}
fn default_reconnect_timeout() -> u64 {
    30
}
fn default_window() -> usize {
    crate::candle::DEFAULT_CAPACITY
}
fn default_trend_index() -> usize {
    crate::bot::DEFAULT_TREND_INDEX
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            exchange: default_exchange(),
            symbol: default_symbol(),
            timeframe: default_timeframe(),
            table_id: String::new(),
            amount: default_amount(),
            currency: default_currency(),
            reconnect: true,
            reconnect_timeout_secs: default_reconnect_timeout(),
            window: default_window(),
            trend_index: default_trend_index(),
        }
    }
}

impl BotConfig {
    /// Candle channel, e.g. `CANDLES--BINA-BTC_USDT--10`
    pub fn channel(&self) -> String {
        format!(
            "CANDLES--{}-{}--{}",
            self.exchange, self.symbol, self.timeframe
        )
    }

    /// Reconnect delay, or `None` when reconnecting is off
    pub fn reconnect_timeout(&self) -> Option<Duration> {
        self.reconnect
            .then(|| Duration::from_secs(self.reconnect_timeout_secs))
    }
}

/// Ticker session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Silence across all channels before the connection is dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout() -> u64 {
    crate::ticker::DEFAULT_IDLE_TIMEOUT.as_secs()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Starting free balance in paper mode, in the bot's currency
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

fn default_paper_balance() -> Decimal {
    Decimal::ONE_HUNDRED
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            paper_balance: default_paper_balance(),
        }
    }
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration
    pub fn embedded() -> anyhow::Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Replace the API key when `key` is given and non-empty
    pub fn with_api_key(mut self, key: Option<&str>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api.api_key = key.to_string();
        }
        self
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.bot.timeframe > 0, "bot.timeframe must be positive");
        anyhow::ensure!(self.bot.window >= 2, "bot.window must be at least 2");
        anyhow::ensure!(self.bot.amount > Decimal::ZERO, "bot.amount must be positive");
        Ok(())
    }
}
