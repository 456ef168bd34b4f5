//! Shared helpers

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

pub const CHANNEL: &str = "CANDLES--BINA-BTC_USDT--10";

/// Poll `check` until it holds, giving spawned tasks time to run
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Candle row in the stream's textual form
pub fn row(time: i64, open: Decimal, close: Decimal) -> Value {
    json!([
        time.to_string(),
        open.to_string(),
        open.max(close).to_string(),
        open.min(close).to_string(),
        close.to_string(),
        "3.25"
    ])
}

/// Tick holding periods 60..=100 of a 10 second channel, bodies oldest
/// first, with a flat bar in the current period
pub fn tick(bodies: [Decimal; 4]) -> Value {
    let mut rows: Vec<Value> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| row(60 + i as i64 * 10, dec!(50), dec!(50) + body))
        .collect();
    rows.push(row(100, dec!(50), dec!(50)));
    Value::Array(rows)
}
