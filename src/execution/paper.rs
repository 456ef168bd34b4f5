//! Paper trading backend

use crate::api::{ApiError, Balance, OrderReceipt, OrderRequest, Params, TradeApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Order placed against the simulated balance
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub order_id: String,
    pub request: OrderRequest,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PaperState {
    balance: Balance,
    open: HashMap<String, PaperOrder>,
    history: Vec<PaperOrder>,
}

/// In-memory stand-in for the trade API
///
/// Orders move the stake from free to in-game funds; cancelling moves it
/// back. Nothing ever settles.
pub struct PaperTrade {
    state: Arc<RwLock<PaperState>>,
}

impl PaperTrade {
    /// Start with `amount` free funds in `currency`
    pub fn new(currency: &str, amount: Decimal) -> Self {
        Self::with_balance(Balance {
            free: HashMap::from([(currency.to_string(), amount)]),
            in_game: HashMap::new(),
        })
    }

    pub fn with_balance(balance: Balance) -> Self {
        Self {
            state: Arc::new(RwLock::new(PaperState {
                balance,
                ..Default::default()
            })),
        }
    }

    /// Every order placed so far, oldest first
    pub async fn orders(&self) -> Vec<PaperOrder> {
        self.state.read().await.history.clone()
    }
}

#[async_trait]
impl TradeApi for PaperTrade {
    async fn tables(&self) -> Result<Value, ApiError> {
        Ok(json!({ "code": 200, "data": [] }))
    }

    async fn next_round(&self, _params: &Params) -> Result<Value, ApiError> {
        Ok(json!({ "code": 200, "data": [] }))
    }

    async fn history(&self, _params: &Params) -> Result<Value, ApiError> {
        Ok(json!({ "code": 200, "data": [] }))
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ApiError> {
        if order.amount <= Decimal::ZERO {
            return Err(ApiError::Rejected(format!("bad amount {}", order.amount)));
        }

        let mut state = self.state.write().await;
        let free = state.balance.free_amount(&order.currency);
        if free < order.amount {
            return Err(ApiError::Rejected(format!(
                "insufficient {}: {} < {}",
                order.currency, free, order.amount
            )));
        }

        state
            .balance
            .free
            .insert(order.currency.clone(), free - order.amount);
        *state
            .balance
            .in_game
            .entry(order.currency.clone())
            .or_insert(Decimal::ZERO) += order.amount;

        let placed = PaperOrder {
            order_id: uuid::Uuid::new_v4().to_string(),
            request: order.clone(),
            placed_at: Utc::now(),
        };
        state.open.insert(placed.order_id.clone(), placed.clone());
        state.history.push(placed.clone());

        tracing::info!(
            order_id = %placed.order_id,
            direction = order.direction.as_str(),
            amount = %order.amount,
            currency = %order.currency,
            "Paper order placed"
        );

        Ok(OrderReceipt {
            order_id: placed.order_id,
            balance: state.balance.clone(),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Balance, ApiError> {
        let mut state = self.state.write().await;
        let Some(order) = state.open.remove(order_id) else {
            return Err(ApiError::Rejected(format!("unknown order {}", order_id)));
        };

        let OrderRequest {
            amount, currency, ..
        } = order.request;
        *state
            .balance
            .free
            .entry(currency.clone())
            .or_insert(Decimal::ZERO) += amount;
        if let Some(in_game) = state.balance.in_game.get_mut(&currency) {
            *in_game -= amount;
        }

        tracing::info!(%order_id, "Paper order cancelled");
        Ok(state.balance.clone())
    }

    async fn balance(&self) -> Result<Balance, ApiError> {
        Ok(self.state.read().await.balance.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Direction;
    use rust_decimal_macros::dec;

    fn order(amount: Decimal) -> OrderRequest {
        OrderRequest {
            table_id: "1".into(),
            direction: Direction::Up,
            amount,
            currency: "USDT".into(),
        }
    }

    #[tokio::test]
    async fn test_order_moves_stake_in_game() {
        let paper = PaperTrade::new("USDT", dec!(10));

        let receipt = paper.create_order(&order(dec!(3))).await.unwrap();
        assert!(!receipt.order_id.is_empty());
        assert_eq!(receipt.balance.free_amount("USDT"), dec!(7));
        assert_eq!(receipt.balance.in_game_amount("USDT"), dec!(3));

        let orders = paper.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, receipt.order_id);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected() {
        let paper = PaperTrade::new("USDT", dec!(2));

        let err = paper.create_order(&order(dec!(5))).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
        assert_eq!(paper.balance().await.unwrap().free_amount("USDT"), dec!(2));
        assert!(paper.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let paper = PaperTrade::new("USDT", dec!(2));
        assert!(paper.create_order(&order(dec!(0))).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_refunds() {
        let paper = PaperTrade::new("USDT", dec!(10));
        let receipt = paper.create_order(&order(dec!(4))).await.unwrap();

        let balance = paper.cancel_order(&receipt.order_id).await.unwrap();
        assert_eq!(balance.free_amount("USDT"), dec!(10));
        assert_eq!(balance.in_game_amount("USDT"), dec!(0));

        // Second cancel of the same order fails
        assert!(paper.cancel_order(&receipt.order_id).await.is_err());
    }

    #[tokio::test]
    async fn test_listings_are_empty() {
        let paper = PaperTrade::new("USDT", dec!(1));
        let tables = paper.tables().await.unwrap();
        assert_eq!(tables["data"], json!([]));
        assert_eq!(
            paper.history(&Params::new()).await.unwrap()["data"],
            json!([])
        );
    }
}
