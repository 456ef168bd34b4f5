//! Bot that only logs what it receives

use super::BotContext;
use serde_json::Value;

pub struct SimpleBot {
    channel: String,
}

impl SimpleBot {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }

    pub fn on_init(&mut self, ctx: &mut BotContext) {
        ctx.subscribe(self.channel.clone());
    }

    pub fn on_tick(&mut self, data: &Value) {
        tracing::info!(channel = %self.channel, %data, "Tick");
    }
}
