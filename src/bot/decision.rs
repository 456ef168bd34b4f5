//! Trend reversal decision rule over the candle window

use crate::candle::CandleStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Smallest bar body treated as a move
pub const EPSILON: Decimal = dec!(0.00000001);

/// Default lookback depth at which a trend is confirmed
pub const DEFAULT_TREND_INDEX: usize = 2;

/// Trade command produced by the decision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// No action this period
    Hold,
    /// Bet on the price going up (+1)
    Up,
    /// Bet on the price going down (-1)
    Down,
}

impl Command {
    fn from_sign(sign: i8) -> Self {
        match sign {
            s if s > 0 => Command::Up,
            s if s < 0 => Command::Down,
            _ => Command::Hold,
        }
    }

    /// Numeric form: 0, +1 or -1
    pub fn as_i8(self) -> i8 {
        match self {
            Command::Hold => 0,
            Command::Up => 1,
            Command::Down => -1,
        }
    }

    pub fn is_hold(self) -> bool {
        self == Command::Hold
    }

    pub fn invert(self) -> Self {
        Self::from_sign(-self.as_i8())
    }
}

/// Decision rule parameters
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    /// Depth (1 = last completed bar) at which the trend is confirmed
    pub trend_index: usize,
    pub epsilon: Decimal,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self {
            trend_index: DEFAULT_TREND_INDEX,
            epsilon: EPSILON,
        }
    }
}

impl DecisionEngine {
    pub fn new(trend_index: usize) -> Self {
        Self {
            trend_index,
            ..Default::default()
        }
    }

    /// Decide what to do for the store's current period
    ///
    /// The last completed bar (`current - timeframe`) sets the direction.
    /// Earlier bars of the window are walked newest first; a gap or a bar
    /// that does not move in that direction ends the walk with the
    /// tentative command, which becomes `dir` once the walk reaches
    /// `trend_index`. A walk that spans the whole window without breaking
    /// returns the inverted tentative command.
    ///
    /// Only an unbroken window inverts. Two bars moving in `dir` followed by
    /// flat bars stop the walk past `trend_index` and return `dir` itself,
    /// not `-dir`.
    pub fn decide(&self, store: &CandleStore, last_ordered: i64) -> Command {
        let current = store.current();
        if current <= last_ordered {
            return Command::Hold;
        }

        let timeframe = store.timeframe();
        let Some(candle) = store.get(current - timeframe) else {
            return Command::Hold;
        };
        let body = candle.body();
        if body.abs() < self.epsilon {
            return Command::Hold;
        }
        let dir = if body > Decimal::ZERO {
            Command::Up
        } else {
            Command::Down
        };
        let dir_sign = Decimal::from(dir.as_i8());

        let mut command = Command::Hold;
        if self.trend_index <= 1 {
            command = dir;
        }

        // Completed bars in the window are depths 1..capacity
        for depth in 2..store.capacity() {
            let time = current - depth as i64 * timeframe;
            let moved = match store.get(time) {
                Some(bar) => bar.body() * dir_sign >= self.epsilon,
                None => false,
            };
            if !moved {
                return command;
            }
            if depth == self.trend_index {
                command = dir;
            }
        }

        command.invert()
    }
}
