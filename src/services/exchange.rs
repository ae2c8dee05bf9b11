//! Exchange facade: the external interface (§6) AI agents and the HTTP
//! layer call to submit orders, cancel them, and fetch a single order's
//! status. Grounded on `services/trading.py`'s `place_buy_order` /
//! `place_sell_order` / `cancel_order` / `get_order_status`, collapsed
//! into one `submit_order` that takes `side` as a parameter instead of two
//! near-duplicate entry points.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewOrderRequest, Order, OrderType, OrderView, Side};
use crate::repositories::{LedgerRepository, OrderRepository, PositionRepository, RepositoryError, TraderRepository};
use crate::services::router::{Router, RouterError};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("order quantity must be positive")]
    InvalidQuantity,

    #[error("LIMIT orders require a limit price")]
    MissingLimitPrice,

    #[error("invalid or inactive trader: {0}")]
    InvalidTrader(Uuid),

    #[error("insufficient cash: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },

    #[error("insufficient shares of {symbol}: have {have}, need {need}")]
    InsufficientShares { symbol: String, have: i64, need: i64 },

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order {order_id} is not owned by trader {trader_id}")]
    NotOwner { order_id: Uuid, trader_id: Uuid },
}

fn order_type_label(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
        OrderType::Ioc => "IOC",
    }
}

pub struct ExchangeService {
    pool: PgPool,
    router: Arc<Router>,
}

impl ExchangeService {
    pub fn new(pool: PgPool, router: Arc<Router>) -> Self {
        Self { pool, router }
    }

    pub async fn create_trader(&self, initial_cash_cents: i64) -> Result<Uuid, ExchangeError> {
        let mut tx = self.pool.begin().await?;
        let trader = TraderRepository::create(&mut tx, initial_cash_cents, false).await?;
        tx.commit().await?;
        Ok(trader.trader_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn submit_order(
        &self,
        trader_id: Uuid,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: i64,
        limit_price: Option<i64>,
        tif_seconds: i64,
    ) -> Result<Uuid, ExchangeError> {
        if !self.router.is_known_symbol(symbol) {
            return Err(ExchangeError::UnknownSymbol(symbol.to_string()));
        }
        if quantity <= 0 {
            return Err(ExchangeError::InvalidQuantity);
        }
        if order_type == OrderType::Limit && limit_price.is_none() {
            return Err(ExchangeError::MissingLimitPrice);
        }

        match side {
            Side::Buy => self.validate_buy(trader_id, order_type, quantity, limit_price).await?,
            Side::Sell => self.validate_sell(trader_id, symbol, quantity).await?,
        }

        let request = NewOrderRequest {
            trader_id,
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity,
            limit_price,
            tif_seconds,
        };
        let expires_at = Utc::now() + chrono::Duration::seconds(tif_seconds);

        let mut tx = self.pool.begin().await?;
        let order = OrderRepository::create(&mut tx, &request, expires_at).await?;
        tx.commit().await?;

        crate::metrics::record_order_submitted(symbol, &side.to_string(), order_type_label(order_type));
        self.router.submit(symbol, order.order_id).await?;
        Ok(order.order_id)
    }

    /// Returns `true` if a cancel was accepted, `false` if the order was
    /// already terminal. Errors on a missing order or ownership mismatch.
    pub async fn cancel_order(&self, trader_id: Uuid, order_id: Uuid) -> Result<bool, ExchangeError> {
        let order = OrderRepository::get(&self.pool, order_id)
            .await?
            .ok_or(ExchangeError::OrderNotFound(order_id))?;
        if order.trader_id != trader_id {
            return Err(ExchangeError::NotOwner { order_id, trader_id });
        }
        if order.status.is_terminal() {
            return Ok(false);
        }

        self.router
            .cancel(&order.symbol, order_id, crate::models::CancelReason::User)
            .await?;
        Ok(true)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, ExchangeError> {
        let order: Order = OrderRepository::get(&self.pool, order_id)
            .await?
            .ok_or(ExchangeError::OrderNotFound(order_id))?;
        Ok(OrderView::from(order))
    }

    async fn validate_buy(
        &self,
        trader_id: Uuid,
        order_type: OrderType,
        quantity: i64,
        limit_price: Option<i64>,
    ) -> Result<(), ExchangeError> {
        let trader = TraderRepository::get(&self.pool, trader_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or(ExchangeError::InvalidTrader(trader_id))?;
        let _ = trader;

        if order_type == OrderType::Limit {
            if let Some(limit_price) = limit_price {
                let cash = LedgerRepository::cash_balance(&self.pool, trader_id).await?;
                let required = quantity * limit_price;
                if cash < required {
                    return Err(ExchangeError::InsufficientFunds { have: cash, need: required });
                }
            }
        }
        Ok(())
    }

    async fn validate_sell(&self, trader_id: Uuid, symbol: &str, quantity: i64) -> Result<(), ExchangeError> {
        let position = PositionRepository::get(&self.pool, trader_id, symbol).await?;
        let available = position.map(|p| p.quantity).unwrap_or(0);
        if available < quantity {
            return Err(ExchangeError::InsufficientShares {
                symbol: symbol.to_string(),
                have: available,
                need: quantity,
            });
        }
        Ok(())
    }
}
