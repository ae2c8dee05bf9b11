//! In-memory order book (C1).
//!
//! Grounded on `services/matching/orderbook.rs`'s price-indexed `BTreeMap`
//! of FIFO queues, best-bid/best-ask, and snapshot shape. The book here is
//! owned exclusively by one Symbol Processor task (SPEC_FULL §5), so it
//! carries none of the teacher's concurrency primitives: no `RwLock`, no
//! `DashMap` order index, no atomics, and no `Decimal` — prices and
//! quantities are plain integer cents/shares.

use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use crate::models::{Order, Side};

/// A resting order at a price level, ordered by arrival within the level.
#[derive(Debug, Clone)]
pub struct BookEntry {
    pub order_id: Uuid,
    pub trader_id: Uuid,
    pub price: i64,
    pub remaining_quantity: i64,
    pub sequence: i64,
}

impl From<&Order> for BookEntry {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            trader_id: order.trader_id,
            price: order.limit_price.unwrap_or(0),
            remaining_quantity: order.remaining_quantity(),
            sequence: order.sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BookState {
    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,
}

#[derive(Debug, Clone)]
pub struct DepthLevel {
    pub price: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DepthSnapshot {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// Bids indexed so `.keys().next_back()` is the highest price; asks so
/// `.keys().next()` is the lowest. Within a level, entries are FIFO by
/// insertion, which matches arrival sequence because the processor only
/// ever appends residue after a sweep.
pub struct OrderBook {
    symbol: String,
    bids: BTreeMap<i64, VecDeque<BookEntry>>,
    asks: BTreeMap<i64, VecDeque<BookEntry>>,
    last_trade_price: Option<i64>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_trade_price: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn side_map(&self, side: Side) -> &BTreeMap<i64, VecDeque<BookEntry>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<i64, VecDeque<BookEntry>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn add(&mut self, side: Side, entry: BookEntry) {
        let price = entry.price;
        self.side_map_mut(side)
            .entry(price)
            .or_insert_with(VecDeque::new)
            .push_back(entry);
    }

    /// Removes a resting order by id. Returns `true` if it was found and
    /// removed; empties the price level when it is drained.
    pub fn remove(&mut self, side: Side, price: i64, order_id: Uuid) -> bool {
        let map = self.side_map_mut(side);
        let Some(queue) = map.get_mut(&price) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|e| e.order_id == order_id) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            map.remove(&price);
        }
        true
    }

    pub fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    fn side_size(&self, side: Side) -> i64 {
        self.side_map(side)
            .values()
            .flat_map(|q| q.iter())
            .map(|e| e.remaining_quantity)
            .sum()
    }

    pub fn book_state(&self) -> BookState {
        BookState {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            bid_size: self.side_size(Side::Buy),
            ask_size: self.side_size(Side::Sell),
        }
    }

    pub fn last_trade_price(&self) -> Option<i64> {
        self.last_trade_price
    }

    pub fn set_last_trade_price(&mut self, price: i64) {
        self.last_trade_price = Some(price);
    }

    /// Aggregated quantity per price on each side, best price first, capped
    /// at `depth` levels per side.
    pub fn snapshot(&self, depth: usize) -> DepthSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, queue)| DepthLevel {
                price: *price,
                quantity: queue.iter().map(|e| e.remaining_quantity).sum(),
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, queue)| DepthLevel {
                price: *price,
                quantity: queue.iter().map(|e| e.remaining_quantity).sum(),
            })
            .collect();
        DepthSnapshot { bids, asks }
    }

    /// Mutable access to the opposite side's FIFO at a given price, used by
    /// the matching sweep (C2) to consume makers in place.
    pub(crate) fn level_mut(&mut self, side: Side, price: i64) -> Option<&mut VecDeque<BookEntry>> {
        self.side_map_mut(side).get_mut(&price)
    }

    pub(crate) fn prune_empty_level(&mut self, side: Side, price: i64) {
        let map = self.side_map_mut(side);
        if map.get(&price).map(|q| q.is_empty()).unwrap_or(false) {
            map.remove(&price);
        }
    }

    /// Price levels on `side`, best-first, for the matching sweep to walk.
    pub(crate) fn price_levels(&self, side: Side) -> Vec<i64> {
        match side {
            Side::Buy => self.bids.keys().rev().copied().collect(),
            Side::Sell => self.asks.keys().copied().collect(),
        }
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
    fn best_bid_and_ask_track_extremes() {
        let mut book = OrderBook::new("X");
        book.add(Side::Buy, entry(Uuid::new_v4(), 100, 5, 1));
        book.add(Side::Buy, entry(Uuid::new_v4(), 105, 5, 2));
        book.add(Side::Sell, entry(Uuid::new_v4(), 110, 5, 3));
        book.add(Side::Sell, entry(Uuid::new_v4(), 108, 5, 4));

        assert_eq!(book.best_bid(), Some(105));
        assert_eq!(book.best_ask(), Some(108));
    }

    #[test]
    fn remove_empties_price_level() {
        let mut book = OrderBook::new("X");
        let id = Uuid::new_v4();
        book.add(Side::Buy, entry(id, 100, 5, 1));
        assert!(book.remove(Side::Buy, 100, id));
        assert_eq!(book.best_bid(), None);
        assert!(!book.remove(Side::Buy, 100, id));
    }

    #[test]
    fn fifo_within_price_level_preserves_arrival_order() {
        let mut book = OrderBook::new("X");
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        book.add(Side::Sell, entry(first, 100, 3, 1));
        book.add(Side::Sell, entry(second, 100, 4, 2));

        let level = book.level_mut(Side::Sell, 100).unwrap();
        assert_eq!(level[0].order_id, first);
        assert_eq!(level[1].order_id, second);
    }

    #[test]
    fn snapshot_aggregates_quantity_per_price_best_first() {
        let mut book = OrderBook::new("X");
        book.add(Side::Buy, entry(Uuid::new_v4(), 100, 1, 1));
        book.add(Side::Buy, entry(Uuid::new_v4(), 100, 2, 2));
        book.add(Side::Sell, entry(Uuid::new_v4(), 102, 3, 3));

        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.bids[0].quantity, 3);
        assert_eq!(snapshot.asks[0].price, 102);
    }
}
