//! Trade API types

use crate::bot::Command;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use thiserror::Error;

/// Request parameters: query string for GET, JSON body for POST
pub type Params = BTreeMap<String, String>;

/// Account funds per currency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub free: HashMap<String, Decimal>,
    pub in_game: HashMap<String, Decimal>,
}

impl Balance {
    /// Decode the venue's `{"FREE": {..}, "IN GAME": {..}}` shape
    ///
    /// Amounts may be strings or numbers; anything else is skipped.
    pub fn from_value(raw: &Value) -> Self {
        Self {
            free: decode_amounts(raw.get("FREE")),
            in_game: decode_amounts(raw.get("IN GAME")),
        }
    }

    /// Free funds in `currency`, zero when unknown
    pub fn free_amount(&self, currency: &str) -> Decimal {
        self.free.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn in_game_amount(&self, currency: &str) -> Decimal {
        self.in_game.get(currency).copied().unwrap_or(Decimal::ZERO)
    }
}

fn decode_amounts(raw: Option<&Value>) -> HashMap<String, Decimal> {
    let Some(Value::Object(map)) = raw else {
        return HashMap::new();
    };

    map.iter()
        .filter_map(|(currency, value)| {
            let amount = match value {
                Value::String(s) => Decimal::from_str(s.trim()).ok(),
                Value::Number(n) => Decimal::from_str(&n.to_string())
                    .ok()
                    .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
                _ => None,
            }?;
            Some((currency.clone(), amount))
        })
        .collect()
}

/// Binary option direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction for a trade command; `None` for hold
    pub fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::Up => Some(Direction::Up),
            Command::Down => Some(Direction::Down),
            Command::Hold => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Order submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub table_id: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub currency: String,
}

impl OrderRequest {
    /// Wire parameters for the order endpoint
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("table_id".into(), self.table_id.clone());
        params.insert("type".into(), self.direction.as_str().into());
        params.insert("amount".into(), self.amount.normalize().to_string());
        params.insert("currency".into(), self.currency.clone());
        params
    }
}

/// Accepted order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order_id: String,
    /// Balance after the stake was taken
    pub balance: Balance,
}

/// Trade API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bad response from {uri}: {body}")]
    BadResponse { uri: String, body: String },

    #[error("Code {code} from {uri}: {body}")]
    Code { code: i64, uri: String, body: String },

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("API key not set")]
    MissingKey,
}
