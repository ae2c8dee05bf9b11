use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub trade_id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub symbol: String,
    pub price: i64,
    pub quantity: i64,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_order_id: Uuid,
    pub executed_at: DateTime<Utc>,
}

/// Fields needed to record a trade; `executed_at` is stamped by the
/// repository at insert time.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub symbol: String,
    pub price: i64,
    pub quantity: i64,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcCandle {
    pub bucket_start: DateTime<Utc>,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
    pub volume: i64,
}
