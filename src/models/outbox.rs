use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::MarketDataEventType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    pub event_id: Uuid,
    pub event_type: MarketDataEventType,
    pub symbol: String,
    pub payload: serde_json::Value,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// Channel name per SPEC_FULL §6: `"<EVENT_TYPE>.<symbol>"`.
    pub fn channel(&self) -> String {
        format!("{}.{}", self.event_type.as_channel_segment(), self.symbol)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePayload {
    pub price: i64,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookStatePayload {
    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEventPayload {
    pub trade: TradePayload,
    pub book: BookStatePayload,
}
