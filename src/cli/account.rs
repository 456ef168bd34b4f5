//! Account queries against the live API

use crate::api::{TradeApi, UpwingoClient, UpwingoConfig};
use crate::config::Config;
use clap::Args;

fn client(config: &Config) -> anyhow::Result<UpwingoClient> {
    let upwingo =
        UpwingoConfig::new(config.api.api_key.clone()).base_url(config.api.base_url.clone());
    Ok(UpwingoClient::new(upwingo)?)
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Only show this currency
    #[arg(long)]
    pub currency: Option<String>,
}

impl BalanceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let balance = client(config)?.balance().await?;

        let mut currencies: Vec<&String> = balance.free.keys().chain(balance.in_game.keys()).collect();
        currencies.sort();
        currencies.dedup();

        println!("{:<8} {:>16} {:>16}", "CURRENCY", "FREE", "IN GAME");
        for currency in currencies {
            if self.currency.as_ref().is_some_and(|c| c != currency) {
                continue;
            }
            println!(
                "{:<8} {:>16} {:>16}",
                currency,
                balance.free_amount(currency),
                balance.in_game_amount(currency)
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct TablesArgs {
    /// Print the raw response
    #[arg(long)]
    pub raw: bool,
}

impl TablesArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let body = client(config)?.tables().await?;
        let tables = if self.raw { &body } else { body.get("data").unwrap_or(&body) };
        println!("{}", serde_json::to_string_pretty(tables)?);
        Ok(())
    }
}
