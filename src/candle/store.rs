//! Rolling candle window keyed by period start

use super::Candle;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default number of periods kept in the window
pub const DEFAULT_CAPACITY: usize = 5;

/// Bounded window of recent candles
///
/// Holds at most `capacity` periods ending at the newest period seen.
/// Every retained key satisfies `key > current - capacity * timeframe`.
#[derive(Debug, Clone)]
pub struct CandleStore {
    candles: BTreeMap<i64, Candle>,
    current: i64,
    capacity: usize,
    timeframe: i64,
}

impl CandleStore {
    /// Create an empty store for bars of `timeframe` seconds
    pub fn new(capacity: usize, timeframe: i64) -> Self {
        Self {
            candles: BTreeMap::new(),
            current: 0,
            capacity,
            timeframe,
        }
    }

    /// Store a candle, overwriting any bar with the same key
    ///
    /// Incomplete candles are ignored. Returns whether the candle was kept.
    /// Eviction is deferred to [`CandleStore::evict`].
    pub fn insert(&mut self, candle: Candle) -> bool {
        if !candle.is_complete() {
            return false;
        }
        if candle.time > self.current {
            self.current = candle.time;
        }
        self.candles.insert(candle.time, candle);
        true
    }

    /// Apply one tick payload: decode each row, keep the valid ones, then
    /// trim the window. Returns the number of candles stored.
    pub fn apply_rows(&mut self, payload: &Value) -> usize {
        let rows = match payload {
            Value::Array(rows) => rows.as_slice(),
            Value::Object(map) => match map.get("data") {
                Some(Value::Array(rows)) => rows.as_slice(),
                _ => &[],
            },
            _ => &[],
        };

        let mut stored = 0;
        for row in rows {
            match Candle::from_row(row) {
                Ok(candle) => {
                    if self.insert(candle) {
                        stored += 1;
                    }
                }
                Err(e) => {
                    tracing::trace!(error = %e, "Skipping candle row");
                }
            }
        }

        self.evict();
        stored
    }

    /// Drop every bar at or before `current - capacity * timeframe`
    pub fn evict(&mut self) {
        let cutoff = self.cutoff();
        self.candles = self.candles.split_off(&(cutoff + 1));
    }

    fn cutoff(&self) -> i64 {
        self.current - self.capacity as i64 * self.timeframe
    }

    /// Newest period seen (0 before any candle)
    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeframe(&self) -> i64 {
        self.timeframe
    }

    pub fn get(&self, time: i64) -> Option<&Candle> {
        self.candles.get(&time)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Retained period keys, oldest first
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.candles.keys().copied()
    }
}
