//! End-to-end integration tests

use rust_decimal_macros::dec;
use upwingo_bot::api::{ApiError, VenueApi};
use upwingo_bot::config::{Config, ExecutionMode};

fn example_config() -> Config {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    Config::load(path).unwrap()
}

#[test]
fn test_config_example_loads() {
    let config = example_config();
    assert_eq!(config.bot.channel(), "CANDLES--BINA-BTC_USDT--10");
    assert_eq!(config.execution.mode, ExecutionMode::Paper);
    assert_eq!(config.execution.paper_balance, dec!(100));
}

#[tokio::test]
async fn test_paper_venue_needs_no_key() {
    let config = example_config();
    let api = VenueApi::from_config(&config).unwrap();

    let balance = api.trade.balance().await.unwrap();
    assert_eq!(balance.free_amount("USDT"), dec!(100));
}

#[test]
fn test_live_venue_requires_key() {
    let mut config = example_config();
    config.execution.mode = ExecutionMode::Live;

    assert!(matches!(
        VenueApi::from_config(&config),
        Err(ApiError::MissingKey)
    ));

    let config = config.with_api_key(Some("secret"));
    assert!(VenueApi::from_config(&config).is_ok());
}
