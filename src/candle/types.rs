//! Candle value type and row decoding

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// Number of fields in a streamed candle row: time, open, high, low, close, volume
const ROW_FIELDS: usize = 6;

/// Errors raised while decoding a single candle row
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Row is not a list of the expected length
    #[error("Malformed candle row")]
    Malformed,
    /// A field could not be parsed as a number
    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    /// Parsed candle is missing a required positive value
    #[error("Incomplete candle at {0}")]
    Incomplete(i64),
}

/// An aggregated OHLCV bar for one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Period start (seconds since epoch), used as the store key
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// A candle is complete when every price is positive, volume is
    /// non-negative and the period key is set
    pub fn is_complete(&self) -> bool {
        self.open > Decimal::ZERO
            && self.high > Decimal::ZERO
            && self.low > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.volume >= Decimal::ZERO
            && self.time > 0
    }

    /// Signed body of the bar
    pub fn body(&self) -> Decimal {
        self.close - self.open
    }

    /// Period start as a UTC timestamp
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }

    /// Decode one streamed row `[time, open, high, low, close, volume]`
    ///
    /// Fields may be JSON strings or numbers. Rows that parse but are not
    /// complete are rejected.
    pub fn from_row(row: &Value) -> Result<Self, DecodeError> {
        let fields = row.as_array().ok_or(DecodeError::Malformed)?;
        if fields.len() < ROW_FIELDS {
            return Err(DecodeError::Malformed);
        }

        let candle = Candle {
            time: parse_time(&fields[0])?,
            open: parse_decimal("open", &fields[1])?,
            high: parse_decimal("high", &fields[2])?,
            low: parse_decimal("low", &fields[3])?,
            close: parse_decimal("close", &fields[4])?,
            volume: parse_decimal("volume", &fields[5])?,
        };

        if !candle.is_complete() {
            return Err(DecodeError::Incomplete(candle.time));
        }

        Ok(candle)
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_time(value: &Value) -> Result<i64, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field: "time",
        value: value.to_string(),
    };
    let text = field_text(value).ok_or_else(invalid)?;
    if let Ok(time) = text.parse::<i64>() {
        return Ok(time);
    }
    // Some feeds send the period key as a float
    let time = Decimal::from_str(&text).map_err(|_| invalid())?;
    if !time.fract().is_zero() {
        return Err(invalid());
    }
    time.to_i64().ok_or_else(invalid)
}

fn parse_decimal(field: &'static str, value: &Value) -> Result<Decimal, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field,
        value: value.to_string(),
    };
    let text = field_text(value).ok_or_else(invalid)?;
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| invalid())
}
