//! Wires a bot to the venue
//!
//! The orchestrator initializes the bot, starts the ticker session and,
//! on every connect, installs one watcher per channel the bot declared.
//! Ticks run the bot's handler under its lock; once the bot reports itself
//! stopped the whole session is torn down.

use crate::api::VenueApi;
use crate::bot::{Bot, BotRuntime};
use crate::config::Config;
use crate::ticker::{tick_handler, SessionError, SessionListener, TickerSession};
use crate::ws::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Orchestrator {
    session: TickerSession,
    runtime: Arc<Mutex<BotRuntime>>,
    reconnect: Option<Duration>,
}

impl Orchestrator {
    /// `reconnect` is the delay before reconnecting after an error or
    /// disconnect; `None` disables reconnecting.
    pub fn new(
        api: VenueApi,
        bot: Bot,
        idle_timeout: Duration,
        reconnect: Option<Duration>,
    ) -> Self {
        Self {
            session: TickerSession::new(api.ticker, idle_timeout),
            runtime: Arc::new(Mutex::new(BotRuntime::new(bot, api.trade))),
            reconnect,
        }
    }

    pub fn from_config(api: VenueApi, config: &Config) -> Self {
        Self::new(
            api,
            Bot::from_config(&config.bot),
            config.session.idle_timeout(),
            config.bot.reconnect_timeout(),
        )
    }

    /// Initialize the bot and, unless it stopped itself, start streaming
    ///
    /// Fails with [`SessionError::AlreadyStarted`] while a session is live,
    /// leaving the running bot's state alone.
    pub async fn run(&self) -> Result<(), SessionError> {
        if self.session.is_started().await {
            return Err(SessionError::AlreadyStarted);
        }

        let channels = {
            let mut runtime = self.runtime.lock().await;
            runtime.init().await;
            if runtime.is_stopped() {
                tracing::warn!("Bot stopped during init, not connecting");
                return Ok(());
            }
            runtime.channels()
        };

        let listener = Arc::new(ClientListener {
            session: self.session.clone(),
            runtime: self.runtime.clone(),
            channels,
            reconnect: self.reconnect,
        });
        self.session.start(listener).await
    }

    /// Stop streaming. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.session.stop().await;
    }

    pub fn session(&self) -> &TickerSession {
        &self.session
    }

    pub async fn is_bot_stopped(&self) -> bool {
        self.runtime.lock().await.is_stopped()
    }
}

struct ClientListener {
    session: TickerSession,
    runtime: Arc<Mutex<BotRuntime>>,
    channels: Vec<String>,
    reconnect: Option<Duration>,
}

impl ClientListener {
    async fn schedule_reconnect(&self) {
        if let Some(timeout) = self.reconnect {
            self.session.reconnect(timeout).await;
        }
    }
}

#[async_trait]
impl SessionListener for ClientListener {
    async fn on_connect(&self) {
        tracing::info!("Connected");

        for channel in &self.channels {
            let runtime = self.runtime.clone();
            let session = self.session.clone();
            let handler = tick_handler(move |data| {
                let runtime = runtime.clone();
                let session = session.clone();
                async move {
                    let stopped = {
                        let mut runtime = runtime.lock().await;
                        runtime.tick(data).await;
                        runtime.is_stopped()
                    };
                    if stopped {
                        tracing::info!("Bot stopped, closing session");
                        session.stop().await;
                    }
                }
            });
            self.session.watch(channel, Some(handler)).await;
        }
    }

    async fn on_error(&self, error: TransportError) {
        tracing::warn!(error = %error, "Ticker error");
        self.schedule_reconnect().await;
    }

    async fn on_disconnect(&self, error: Option<TransportError>) {
        match error {
            Some(e) => tracing::warn!(error = %e, "Disconnected"),
            None => tracing::info!("Disconnected"),
        }
        self.schedule_reconnect().await;
    }
}
