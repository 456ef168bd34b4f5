//! At most one accepted order per period

use super::{BotError, Command};
use crate::api::{Balance, Direction, OrderRequest, TradeApi};
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Guards order submission with a cached balance and the last period an
/// order was accepted for
#[derive(Debug, Clone)]
pub struct OrderGate {
    table_id: String,
    amount: Decimal,
    currency: String,
    last_ordered: i64,
    balance: Balance,
}

impl OrderGate {
    pub fn new(table_id: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            amount,
            currency: currency.into(),
            last_ordered: 0,
            balance: Balance::default(),
        }
    }

    /// Period of the last accepted order, 0 before any
    pub fn last_ordered(&self) -> i64 {
        self.last_ordered
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn set_balance(&mut self, balance: Balance) {
        self.record_free(&balance);
        self.balance = balance;
    }

    /// Forget the last ordered period and cached balance
    pub fn reset(&mut self) {
        self.last_ordered = 0;
        self.balance = Balance::default();
    }

    /// Submit an order for `period` in the direction of `command`
    ///
    /// Hold submits nothing. A stake above the cached free balance fails
    /// with [`BotError::InsufficientFunds`] before any request is made. A
    /// failed request leaves the gate untouched so the same period can be
    /// tried again. On success the returned balance replaces the cached one
    /// and `period` becomes the last ordered period.
    pub async fn submit(
        &mut self,
        trade: &dyn TradeApi,
        period: i64,
        command: Command,
    ) -> Result<Option<String>, BotError> {
        let Some(direction) = Direction::from_command(command) else {
            return Ok(None);
        };

        let available = self.balance.free_amount(&self.currency);
        if self.amount > available {
            return Err(BotError::InsufficientFunds {
                currency: self.currency.clone(),
                required: self.amount,
                available,
            });
        }

        let order = OrderRequest {
            table_id: self.table_id.clone(),
            direction,
            amount: self.amount,
            currency: self.currency.clone(),
        };

        let receipt = match trade.create_order(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                increment(CounterMetric::OrdersFailed);
                return Err(e.into());
            }
        };

        increment(CounterMetric::OrdersSubmitted);
        tracing::info!(
            order_id = %receipt.order_id,
            period,
            direction = direction.as_str(),
            amount = %self.amount,
            "Order placed"
        );

        self.set_balance(receipt.balance);
        self.last_ordered = period;
        Ok(Some(receipt.order_id))
    }

    fn record_free(&self, balance: &Balance) {
        if let Some(free) = balance.free_amount(&self.currency).to_f64() {
            set_gauge(GaugeMetric::FreeBalance, free);
        }
    }
}
