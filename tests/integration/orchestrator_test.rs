//! Bot, session and paper backend wired together

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use upwingo_bot::api::{
    ApiError, Balance, Direction, OrderReceipt, OrderRequest, Params, TradeApi, VenueApi,
};
use upwingo_bot::bot::Bot;
use upwingo_bot::config::{BotConfig, Strategy};
use upwingo_bot::execution::PaperTrade;
use upwingo_bot::orchestrator::Orchestrator;
use upwingo_bot::ticker::loopback::LoopbackConnector;
use upwingo_bot::ticker::StreamConnection;
use upwingo_bot::ws::TransportError;

use crate::support::{eventually, tick, CHANNEL};

fn orchestrator(
    trade: Arc<dyn TradeApi>,
    connector: &LoopbackConnector,
    reconnect: Option<Duration>,
) -> Orchestrator {
    let api = VenueApi::new(trade, Arc::new(connector.clone()));
    Orchestrator::new(
        api,
        Bot::from_config(&BotConfig::default()),
        Duration::from_secs(120),
        reconnect,
    )
}

/// Trade API that cannot report a balance
struct Offline;

#[async_trait]
impl TradeApi for Offline {
    async fn tables(&self) -> Result<Value, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
    async fn next_round(&self, _params: &Params) -> Result<Value, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
    async fn history(&self, _params: &Params) -> Result<Value, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
    async fn create_order(&self, _order: &OrderRequest) -> Result<OrderReceipt, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
    async fn cancel_order(&self, _order_id: &str) -> Result<Balance, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
    async fn balance(&self) -> Result<Balance, ApiError> {
        Err(ApiError::Rejected("offline".into()))
    }
}

#[tokio::test]
async fn test_tick_to_order() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(10)));
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(paper.clone(), &connector, None);

    orchestrator.run().await.unwrap();
    let session = orchestrator.session();
    assert!(
        eventually(|| async move { session.watched_channels().await == vec![CHANNEL] }).await
    );

    let connection = connector.last().unwrap();
    assert!(connection.publish(CHANNEL, tick([dec!(1), dec!(-1), dec!(1), dec!(1)])));

    let orders = &paper;
    assert!(eventually(|| async move { orders.orders().await.len() == 1 }).await);
    let placed = paper.orders().await;
    assert_eq!(placed[0].request.direction, Direction::Up);
    assert_eq!(placed[0].request.amount, Decimal::ONE);

    // Same period again: no second order
    connection.publish(CHANNEL, tick([dec!(1), dec!(-1), dec!(1), dec!(1)]));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(paper.orders().await.len(), 1);

    orchestrator.stop().await;
    orchestrator.stop().await;
    assert!(!session.is_started().await);
}

#[tokio::test]
async fn test_second_run_keeps_live_bot_state() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(10)));
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(paper.clone(), &connector, None);

    orchestrator.run().await.unwrap();
    let session = orchestrator.session();
    assert!(eventually(|| async move { !session.watched_channels().await.is_empty() }).await);

    let connection = connector.last().unwrap();
    let payload = tick([dec!(1), dec!(-1), dec!(1), dec!(1)]);
    connection.publish(CHANNEL, payload.clone());
    let orders = &paper;
    assert!(eventually(|| async move { orders.orders().await.len() == 1 }).await);

    assert_eq!(
        orchestrator.run().await,
        Err(upwingo_bot::ticker::SessionError::AlreadyStarted)
    );
    assert_eq!(connector.opened(), 1);

    // Period 100 already has its order
    connection.publish(CHANNEL, payload);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(paper.orders().await.len(), 1);
    assert!(!orchestrator.is_bot_stopped().await);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_init_failure_never_connects() {
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(Arc::new(Offline), &connector, Some(Duration::from_secs(1)));

    orchestrator.run().await.unwrap();

    assert!(orchestrator.is_bot_stopped().await);
    assert_eq!(connector.opened(), 0);
    assert!(!orchestrator.session().is_started().await);
}

#[tokio::test]
async fn test_insufficient_funds_tears_down_session() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(0.25)));
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(paper.clone(), &connector, Some(Duration::from_secs(1)));

    orchestrator.run().await.unwrap();
    let session = orchestrator.session();
    assert!(eventually(|| async move { !session.watched_channels().await.is_empty() }).await);

    let connection = connector.last().unwrap();
    connection.publish(CHANNEL, tick([dec!(-1), dec!(-1), dec!(-1), dec!(-1)]));

    assert!(eventually(|| async move { !session.is_started().await }).await);
    assert!(orchestrator.is_bot_stopped().await);
    assert!(!connection.is_connected());
    assert!(paper.orders().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_reconnects_and_rewatches() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(10)));
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(paper, &connector, Some(Duration::from_secs(30)));

    orchestrator.run().await.unwrap();
    let session = orchestrator.session();
    assert!(eventually(|| async move { !session.watched_channels().await.is_empty() }).await);

    let connection = connector.last().unwrap();
    connection.drop_connection(Some(TransportError::StreamEnded));
    assert!(eventually(|| async move { session.watched_channels().await.is_empty() }).await);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(eventually(|| async move { !session.watched_channels().await.is_empty() }).await);
    assert_eq!(connection.connect_count(), 2);
    assert_eq!(connection.subscriptions(), vec![CHANNEL, CHANNEL]);

    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_disabled() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(10)));
    let connector = LoopbackConnector::new();
    let orchestrator = orchestrator(paper, &connector, None);

    orchestrator.run().await.unwrap();
    let connection = connector.last().unwrap();
    connection.drop_connection(None);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(connection.connect_count(), 1);
    assert!(!connection.is_connected());
}

#[tokio::test]
async fn test_simple_bot_never_trades() {
    let paper = Arc::new(PaperTrade::new("USDT", dec!(10)));
    let connector = LoopbackConnector::new();
    let config = BotConfig {
        strategy: Strategy::Simple,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        VenueApi::new(paper.clone(), Arc::new(connector.clone())),
        Bot::from_config(&config),
        Duration::from_secs(120),
        None,
    );

    orchestrator.run().await.unwrap();
    let session = orchestrator.session();
    assert!(eventually(|| async move { !session.watched_channels().await.is_empty() }).await);

    connector
        .last()
        .unwrap()
        .publish(CHANNEL, tick([dec!(1), dec!(1), dec!(1), dec!(1)]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(paper.orders().await.is_empty());
    orchestrator.stop().await;
}
