//! Sum types shared across the matching, settlement, and read surfaces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side")]
pub enum Side {
    #[sqlx(rename = "BUY")]
    #[serde(rename = "BUY")]
    Buy,
    #[sqlx(rename = "SELL")]
    #[serde(rename = "SELL")]
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// MARKET sweeps with no price guard and discards any residue. LIMIT rests
/// its residue. IOC sweeps like MARKET (or LIMIT, if it carries a price) but
/// never rests — unfilled residue expires the order instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type")]
pub enum OrderType {
    #[sqlx(rename = "MARKET")]
    #[serde(rename = "MARKET")]
    Market,
    #[sqlx(rename = "LIMIT")]
    #[serde(rename = "LIMIT")]
    Limit,
    #[sqlx(rename = "IOC")]
    #[serde(rename = "IOC")]
    Ioc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    #[sqlx(rename = "PENDING")]
    #[serde(rename = "PENDING")]
    Pending,
    #[sqlx(rename = "PARTIAL")]
    #[serde(rename = "PARTIAL")]
    Partial,
    #[sqlx(rename = "FILLED")]
    #[serde(rename = "FILLED")]
    Filled,
    #[sqlx(rename = "CANCELLED")]
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[sqlx(rename = "EXPIRED")]
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Terminal statuses never transition further; the processor treats a
    /// message against a terminal order as a recoverable no-op (§4.3/§4.5).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    pub fn from_fill(filled_quantity: i64, quantity: i64) -> OrderStatus {
        if filled_quantity >= quantity {
            OrderStatus::Filled
        } else if filled_quantity > 0 {
            OrderStatus::Partial
        } else {
            OrderStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cancel_reason")]
pub enum CancelReason {
    #[sqlx(rename = "USER")]
    #[serde(rename = "USER")]
    User,
    #[sqlx(rename = "EXPIRED")]
    #[serde(rename = "EXPIRED")]
    Expired,
    #[sqlx(rename = "IOC_UNFILLED")]
    #[serde(rename = "IOC_UNFILLED")]
    IocUnfilled,
    #[sqlx(rename = "INSUFFICIENT_FUNDS")]
    #[serde(rename = "INSUFFICIENT_FUNDS")]
    InsufficientFunds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "market_data_event_type")]
pub enum MarketDataEventType {
    #[sqlx(rename = "TRADE")]
    #[serde(rename = "TRADE")]
    Trade,
    #[sqlx(rename = "QUOTE")]
    #[serde(rename = "QUOTE")]
    Quote,
    #[sqlx(rename = "DEPTH")]
    #[serde(rename = "DEPTH")]
    Depth,
}

impl MarketDataEventType {
    pub fn as_channel_segment(self) -> &'static str {
        match self {
            MarketDataEventType::Trade => "TRADE",
            MarketDataEventType::Quote => "QUOTE",
            MarketDataEventType::Depth => "DEPTH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_is_involutive() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert_eq!(Side::Buy.opposite().opposite(), Side::Buy);
    }

    #[test]
    fn status_from_fill_transitions() {
        assert_eq!(OrderStatus::from_fill(0, 10), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_fill(4, 10), OrderStatus::Partial);
        assert_eq!(OrderStatus::from_fill(10, 10), OrderStatus::Filled);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Partial.is_terminal());
    }
}
