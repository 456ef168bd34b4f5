//! Run command implementation

use crate::api::VenueApi;
use crate::config::{Config, ExecutionMode, Strategy};
use crate::orchestrator::Orchestrator;
use clap::Args;
use std::time::Duration;

/// Time given to in-flight work after ctrl-c
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trade against a simulated balance
    #[arg(long)]
    pub paper: bool,

    /// Bot to run, overrides the configuration file
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Do not reconnect after errors and disconnects
    #[arg(long)]
    pub no_reconnect: bool,
}

impl RunArgs {
    /// Apply command line overrides to `config`
    pub fn apply(&self, mut config: Config) -> Config {
        if self.paper {
            config.execution.mode = ExecutionMode::Paper;
        }
        if let Some(strategy) = self.strategy {
            config.bot.strategy = strategy;
        }
        if self.no_reconnect {
            config.bot.reconnect = false;
        }
        config
    }

    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = self.apply(config);
        let api = VenueApi::from_config(&config)?;
        let orchestrator = Orchestrator::from_config(api, &config);

        tracing::info!(
            mode = ?config.execution.mode,
            strategy = ?config.bot.strategy,
            channel = %config.bot.channel(),
            "Starting bot"
        );
        orchestrator.run().await?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");
        orchestrator.stop().await;
        tokio::time::sleep(SHUTDOWN_GRACE).await;

        Ok(())
    }
}
