//! Matching engine (C2).
//!
//! Grounded on `engine/order_book_matcher.py`'s `match_order` /
//! `_match_ioc_order` / `_match_market_order` / `_match_limit_order` /
//! `_match_at_price_level` / `_create_trade`. The Python source has three
//! near-duplicate sweep methods distinguished by how the price guard and
//! resting behavior differ; here that collapses into one `sweep` function
//! parameterized by an `Option<i64>` price guard, since LIMIT, MARKET, and
//! IOC only differ in (a) whether a guard applies and (b) what happens to
//! any residue, both of which the caller (Symbol Processor, C3) decides.

use thiserror::Error;
use uuid::Uuid;

use crate::models::Side;
use crate::services::book::{BookEntry, OrderBook};

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("order quantity must be positive")]
    InvalidQuantity,

    #[error("LIMIT and IOC-with-price orders require a limit price")]
    MissingLimitPrice,

    #[error("trader {trader_id} has insufficient cash: needs {need}, has {have}")]
    InsufficientFunds {
        trader_id: Uuid,
        need: i64,
        have: i64,
    },

    #[error("trader {trader_id} has insufficient shares of {symbol}: needs {need}, has {have}")]
    InsufficientShares {
        trader_id: Uuid,
        symbol: String,
        need: i64,
        have: i64,
    },
}

/// One fill produced by a sweep. `price` is always the maker's resting
/// price, never the taker's limit.
#[derive(Debug, Clone)]
pub struct Fill {
    pub maker_order_id: Uuid,
    pub maker_trader_id: Uuid,
    pub price: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct SweepResult {
    pub fills: Vec<Fill>,
    pub remaining_quantity: i64,
}

pub struct MatchingEngine;

impl MatchingEngine {
    /// Sweeps `taker_side`'s opposite side of `book` for up to `quantity`,
    /// guarded by `limit_price` when present (BUY: maker price ≤ limit;
    /// SELL: maker price ≥ limit). A `None` guard sweeps unconditionally,
    /// which is how MARKET and price-less IOC orders are expressed.
    ///
    /// Does not mutate order durable state and does not add residue back to
    /// the book — the caller (C3) owns both, since only it knows whether the
    /// order type wants to rest (LIMIT), discard (MARKET), or expire (IOC).
    pub fn sweep(book: &mut OrderBook, taker_side: Side, quantity: i64, limit_price: Option<i64>) -> SweepResult {
        let opposite = taker_side.opposite();
        let mut remaining = quantity;
        let mut fills = Vec::new();

        let levels = book.price_levels(opposite);
        for price in levels {
            if remaining <= 0 {
                break;
            }
            if let Some(limit) = limit_price {
                let crossable = match taker_side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                if !crossable {
                    break;
                }
            }

            let Some(queue) = book.level_mut(opposite, price) else {
                continue;
            };
            while remaining > 0 {
                let Some(maker) = queue.front_mut() else {
                    break;
                };
                let fill_qty = remaining.min(maker.remaining_quantity);
                fills.push(Fill {
                    maker_order_id: maker.order_id,
                    maker_trader_id: maker.trader_id,
                    price,
                    quantity: fill_qty,
                });
                remaining -= fill_qty;
                maker.remaining_quantity -= fill_qty;
                if maker.remaining_quantity == 0 {
                    queue.pop_front();
                }
            }
            book.prune_empty_level(opposite, price);
        }

        SweepResult {
            fills,
            remaining_quantity: remaining,
        }
    }

    /// Adds a resting maker to the book from an order's current state.
    /// Callers are expected to have already validated the order carries a
    /// limit price (LIMIT orders always do; IOC never rests).
    pub fn add_to_book(book: &mut OrderBook, side: Side, entry: BookEntry) {
        book.add(side, entry);
    }

    pub fn cancel_in_book(book: &mut OrderBook, side: Side, price: i64, order_id: Uuid) -> bool {
        book.remove(side, price, order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(order_id: Uuid, price: i64, qty: i64, sequence: i64) -> BookEntry {
        BookEntry {
            order_id,
            trader_id: Uuid::new_v4(),
            price,
            remaining_quantity: qty,
            sequence,
        }
    }

    #[test]
    fn limit_buy_sweeps_price_levels_in_order_and_stops_at_guard() {
        let mut book = OrderBook::new("X");
        let ask1 = Uuid::new_v4();
        let ask2 = Uuid::new_v4();
        book.add(Side::Sell, entry(ask1, 100, 1, 1));
        book.add(Side::Sell, entry(ask2, 101, 2, 2));

        let result = MatchingEngine::sweep(&mut book, Side::Buy, 3, Some(101));
        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].price, 100);
        assert_eq!(result.fills[0].quantity, 1);
        assert_eq!(result.fills[1].price, 101);
        assert_eq!(result.fills[1].quantity, 2);
        assert_eq!(result.remaining_quantity, 0);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn limit_buy_does_not_cross_above_its_limit() {
        let mut book = OrderBook::new("X");
        book.add(Side::Sell, entry(Uuid::new_v4(), 120, 5, 1));

        let result = MatchingEngine::sweep(&mut book, Side::Buy, 5, Some(100));
        assert!(result.fills.is_empty());
        assert_eq!(result.remaining_quantity, 5);
        assert_eq!(book.best_ask(), Some(120));
    }

    #[test]
    fn market_sweep_has_no_price_guard_and_discards_nothing_itself() {
        let mut book = OrderBook::new("X");
        book.add(Side::Sell, entry(Uuid::new_v4(), 100, 2, 1));

        let result = MatchingEngine::sweep(&mut book, Side::Buy, 5, None);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.remaining_quantity, 3);
    }

    #[test]
    fn partial_fill_leaves_maker_resting_with_reduced_quantity() {
        let mut book = OrderBook::new("X");
        let maker = Uuid::new_v4();
        book.add(Side::Sell, entry(maker, 100, 10, 1));

        let result = MatchingEngine::sweep(&mut book, Side::Buy, 4, Some(100));
        assert_eq!(result.fills[0].quantity, 4);
        let level = book.level_mut(Side::Sell, 100).unwrap();
        assert_eq!(level[0].remaining_quantity, 6);
    }

    #[test]
    fn fifo_within_price_level_fills_oldest_maker_first() {
        let mut book = OrderBook::new("X");
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        book.add(Side::Sell, entry(first, 100, 2, 1));
        book.add(Side::Sell, entry(second, 100, 2, 2));

        let result = MatchingEngine::sweep(&mut book, Side::Buy, 2, Some(100));
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].maker_order_id, first);
    }
}
