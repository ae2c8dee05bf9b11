//! Read Services (C9).
//!
//! Grounded on `api/exchange.py`'s read endpoints: portfolio, current
//! price, recent trades, order book depth, and OHLC history. All reads run
//! against committed state only — the portfolio and trade reads hit the
//! pool directly; price and book reads go through the Router so they see
//! the same in-memory book the matching engine owns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{OhlcCandle, Order, Position, Trade};
use crate::repositories::{LedgerRepository, OrderRepository, PositionRepository, RepositoryError, TradeRepository};
use crate::services::book::DepthSnapshot;
use crate::services::router::{Router, RouterError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub cash: i64,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentPrice {
    pub symbol: String,
    pub last_trade_price: Option<i64>,
    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,
    pub timestamp: DateTime<Utc>,
}

/// Maps the public OHLC `range` parameter to the repository's (bucket,
/// periods) pair, exactly the `range_config` table in `api/exchange.py`:
/// "1d"→1h×24, "1w"→6h×28, "1m"→1d×30, "6m"→1w×26, "1y"→1w×52.
fn range_config(range: &str) -> Option<(&'static str, i64)> {
    match range {
        "1d" => Some(("1h", 24)),
        "1w" => Some(("6h", 28)),
        "1m" => Some(("1d", 30)),
        "6m" => Some(("1w", 26)),
        "1y" => Some(("1w", 52)),
        _ => None,
    }
}

pub struct ReadService {
    pool: PgPool,
    router: Arc<Router>,
}

impl ReadService {
    pub fn new(pool: PgPool, router: Arc<Router>) -> Self {
        Self { pool, router }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, ReadError> {
        OrderRepository::get(&self.pool, order_id)
            .await?
            .ok_or(ReadError::OrderNotFound(order_id))
    }

    /// Combines cash balance with non-zero positions (SPEC_FULL §4.9).
    pub async fn get_portfolio(&self, trader_id: Uuid) -> Result<Portfolio, ReadError> {
        let cash = LedgerRepository::cash_balance(&self.pool, trader_id).await?;
        let positions = PositionRepository::list_nonzero(&self.pool, trader_id).await?;
        Ok(Portfolio { cash, positions })
    }

    pub async fn get_book(&self, symbol: &str) -> Result<DepthSnapshot, ReadError> {
        Ok(self.router.get_book(symbol).await?)
    }

    pub async fn get_price(&self, symbol: &str) -> Result<CurrentPrice, ReadError> {
        let state = self.router.get_book_state(symbol).await?;
        let recent = TradeRepository::recent(&self.pool, symbol, 1).await?;
        Ok(CurrentPrice {
            symbol: symbol.to_string(),
            last_trade_price: recent.first().map(|t| t.price),
            best_bid: state.best_bid,
            best_ask: state.best_ask,
            bid_size: state.bid_size,
            ask_size: state.ask_size,
            timestamp: Utc::now(),
        })
    }

    pub async fn get_recent_trades(&self, symbol: &str, limit: i64) -> Result<Vec<Trade>, ReadError> {
        Ok(TradeRepository::recent(&self.pool, symbol, limit).await?)
    }

    pub async fn get_ohlc(&self, symbol: &str, range: &str) -> Result<Vec<OhlcCandle>, ReadError> {
        let (bucket, periods) = range_config(range).unwrap_or(("1d", 30));
        Ok(TradeRepository::ohlc(&self.pool, symbol, bucket, periods).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_config_matches_the_documented_table() {
        assert_eq!(range_config("1d"), Some(("1h", 24)));
        assert_eq!(range_config("1w"), Some(("6h", 28)));
        assert_eq!(range_config("1m"), Some(("1d", 30)));
        assert_eq!(range_config("6m"), Some(("1w", 26)));
        assert_eq!(range_config("1y"), Some(("1w", 52)));
        assert_eq!(range_config("bogus"), None);
    }
}
