//! Candle trend reversal bot

use super::{BotContext, BotError, DecisionEngine, OrderGate};
use crate::candle::CandleStore;
use crate::config::BotConfig;
use serde_json::Value;

/// Trades the candle channel of one symbol
///
/// Each tick updates the candle window and asks the decision engine for a
/// command; non-hold commands go through the [`OrderGate`].
pub struct TrendBot {
    channel: String,
    timeframe: i64,
    window: usize,
    engine: DecisionEngine,
    store: CandleStore,
    gate: OrderGate,
}

impl TrendBot {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            channel: config.channel(),
            timeframe: config.timeframe,
            window: config.window,
            engine: DecisionEngine::new(config.trend_index),
            store: CandleStore::new(config.window, config.timeframe),
            gate: OrderGate::new(
                config.table_id.clone(),
                config.amount,
                config.currency.clone(),
            ),
        }
    }

    /// Fetch the starting balance and declare the candle channel.
    /// Stops the bot when the balance cannot be fetched.
    pub async fn on_init(&mut self, ctx: &mut BotContext) {
        self.store = CandleStore::new(self.window, self.timeframe);
        self.gate.reset();

        match ctx.trade().balance().await {
            Ok(balance) => self.gate.set_balance(balance),
            Err(e) => {
                tracing::error!(error = %e, "Balance fetch failed, stopping bot");
                ctx.stop();
                return;
            }
        }

        ctx.subscribe(self.channel.clone());
    }

    pub async fn on_tick(&mut self, ctx: &mut BotContext, data: &Value) {
        let stored = self.store.apply_rows(data);
        tracing::trace!(stored, current = self.store.current(), "Candles updated");

        let command = self.engine.decide(&self.store, self.gate.last_ordered());
        if command.is_hold() {
            return;
        }

        let period = self.store.current();
        tracing::debug!(period, ?command, "Trend signal");

        match self.gate.submit(ctx.trade(), period, command).await {
            Ok(_) => {}
            Err(e @ BotError::InsufficientFunds { .. }) => {
                tracing::error!(error = %e, "Stopping bot");
                ctx.stop();
            }
            Err(e) => tracing::warn!(error = %e, period, "Order skipped"),
        }
    }

    pub fn store(&self) -> &CandleStore {
        &self.store
    }

    pub fn gate(&self) -> &OrderGate {
        &self.gate
    }
}
