use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{CancelReason, OrderStatus, OrderType, Side};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: Uuid,
    pub trader_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<i64>,
    pub filled_quantity: i64,
    pub status: OrderStatus,
    pub cancel_reason: Option<CancelReason>,
    pub sequence: i64,
    pub tif_seconds: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.filled_quantity
    }
}

/// Caller-supplied fields for a new order; everything else (order_id,
/// sequence, status, timestamps) is assigned by the order repository.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub trader_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<i64>,
    pub tif_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub trader_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<i64>,
    pub filled_quantity: i64,
    pub status: OrderStatus,
    pub cancel_reason: Option<CancelReason>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            trader_id: order.trader_id,
            symbol: order.symbol,
            side: order.side,
            order_type: order.order_type,
            quantity: order.quantity,
            limit_price: order.limit_price,
            filled_quantity: order.filled_quantity,
            status: order.status,
            cancel_reason: order.cancel_reason,
            created_at: order.created_at,
        }
    }
}
