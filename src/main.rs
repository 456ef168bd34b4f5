use clap::Parser;
use upwingo_bot::cli::{Cli, Commands};
use upwingo_bot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::embedded()?
        }
    };
    let config = config.with_api_key(cli.api_key.as_deref());

    // Initialize telemetry
    upwingo_bot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(config).await?;
        }
        Commands::Balance(args) => {
            args.execute(&config).await?;
        }
        Commands::Tables(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  API: {}", config.api.base_url);
            println!("  Ticker: {}:{}", config.api.ws_host, config.api.ws_port);
            println!(
                "  Key: {}",
                if config.api.api_key.is_empty() { "not set" } else { "set" }
            );
            println!(
                "  Bot: {:?} on {} (table {:?})",
                config.bot.strategy,
                config.bot.channel(),
                config.bot.table_id
            );
            println!("  Stake: {} {}", config.bot.amount, config.bot.currency);
            println!("  Execution: {:?}", config.execution.mode);
            match config.bot.reconnect_timeout() {
                Some(timeout) => println!("  Reconnect: after {}s", timeout.as_secs()),
                None => println!("  Reconnect: off"),
            }
        }
    }

    Ok(())
}
