//! CLI interface for upwingo-bot
//!
//! Provides subcommands for:
//! - `run`: Stream candles and trade
//! - `balance`: Show account balance
//! - `tables`: List binary option tables
//! - `config`: Show the effective configuration

mod account;
mod run;

pub use account::{BalanceArgs, TablesArgs};
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "upwingo-bot")]
#[command(about = "Streaming candle trend bot for Upwingo binary options")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// API key, overrides the configuration file
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream candles and run the bot
    Run(RunArgs),
    /// Show account balance
    Balance(BalanceArgs),
    /// List binary option tables
    Tables(TablesArgs),
    /// Show the effective configuration
    Config,
}
