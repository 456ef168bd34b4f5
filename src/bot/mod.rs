//! Trading bots
//!
//! A bot declares its channels during [`Bot::on_init`] and then reacts to
//! ticks in [`Bot::on_tick`]. Both run with exclusive access to the bot's
//! [`BotContext`], which carries the trade API, the declared channels and
//! the stopped flag the orchestrator watches.

mod decision;
mod order_gate;
mod simple;
mod trend;

pub use decision::{Command, DecisionEngine, DEFAULT_TREND_INDEX, EPSILON};
pub use order_gate::OrderGate;
pub use simple::SimpleBot;
pub use trend::TrendBot;

use crate::api::{ApiError, TradeApi};
use crate::config::{BotConfig, Strategy};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Bot errors
#[derive(Debug, Error)]
pub enum BotError {
    /// Stake exceeds the cached free balance; ends the run
    #[error("Insufficient funds: need {required} {currency}, have {available}")]
    InsufficientFunds {
        currency: String,
        required: Decimal,
        available: Decimal,
    },

    /// Order submission failed; may be retried within the same period
    #[error("Order failed: {0}")]
    Order(#[from] ApiError),
}

impl BotError {
    /// Whether the bot must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::InsufficientFunds { .. })
    }
}

/// What a bot can see and change outside itself
pub struct BotContext {
    trade: Arc<dyn TradeApi>,
    channels: Vec<String>,
    stopped: bool,
}

impl BotContext {
    pub fn new(trade: Arc<dyn TradeApi>) -> Self {
        Self {
            trade,
            channels: Vec::new(),
            stopped: false,
        }
    }

    /// Declare a channel to watch once connected
    pub fn subscribe(&mut self, channel: impl Into<String>) {
        let channel = channel.into();
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn trade(&self) -> &dyn TradeApi {
        self.trade.as_ref()
    }

    /// Ask the orchestrator to end the run
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Clear the stopped flag and declared channels before a new run
    pub fn reset(&mut self) {
        self.stopped = false;
        self.channels.clear();
    }
}

/// Available bots
pub enum Bot {
    Simple(SimpleBot),
    Trend(TrendBot),
}

impl Bot {
    pub fn from_config(config: &BotConfig) -> Self {
        match config.strategy {
            Strategy::Simple => Bot::Simple(SimpleBot::new(config.channel())),
            Strategy::Trend => Bot::Trend(TrendBot::from_config(config)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Bot::Simple(_) => "simple",
            Bot::Trend(_) => "trend",
        }
    }

    pub async fn on_init(&mut self, ctx: &mut BotContext) {
        match self {
            Bot::Simple(bot) => bot.on_init(ctx),
            Bot::Trend(bot) => bot.on_init(ctx).await,
        }
    }

    pub async fn on_tick(&mut self, ctx: &mut BotContext, data: Value) {
        match self {
            Bot::Simple(bot) => bot.on_tick(&data),
            Bot::Trend(bot) => bot.on_tick(ctx, &data).await,
        }
    }
}

/// A bot together with its context
pub struct BotRuntime {
    bot: Bot,
    ctx: BotContext,
}

impl BotRuntime {
    pub fn new(bot: Bot, trade: Arc<dyn TradeApi>) -> Self {
        Self {
            bot,
            ctx: BotContext::new(trade),
        }
    }

    /// Reset the context and run the bot's initialization
    pub async fn init(&mut self) {
        self.ctx.reset();
        self.bot.on_init(&mut self.ctx).await;
        tracing::info!(
            bot = self.bot.name(),
            channels = ?self.ctx.channels(),
            stopped = self.ctx.is_stopped(),
            "Bot initialized"
        );
    }

    pub async fn tick(&mut self, data: Value) {
        if self.ctx.is_stopped() {
            return;
        }
        self.bot.on_tick(&mut self.ctx, data).await;
    }

    pub fn channels(&self) -> Vec<String> {
        self.ctx.channels().to_vec()
    }

    pub fn is_stopped(&self) -> bool {
        self.ctx.is_stopped()
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}
