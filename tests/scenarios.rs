//! End-to-end scenario tests against the pure matching substrate
//! (`OrderBook` + `MatchingEngine`), mirroring the seed scenarios: a taker
//! sweeping a single resting maker, a market order consuming the book and
//! discarding residue, a multi-level sweep that leaves a partial resident,
//! and an IOC that finds no crossable liquidity. These exercise the same
//! price-time-priority logic the Symbol Processor drives, without the
//! database/outbox machinery a full processor loop would need.

use clob_exchange::models::Side;
use clob_exchange::services::book::{BookEntry, OrderBook};
use clob_exchange::services::matching::MatchingEngine;
use uuid::Uuid;

fn maker(order_id: Uuid, price: i64, quantity: i64, sequence: i64) -> BookEntry {
    BookEntry {
        order_id,
        trader_id: Uuid::new_v4(),
        price,
        remaining_quantity: quantity,
        sequence,
    }
}

/// Scenario 1: B posts SELL LIMIT 10 @ 100. A submits BUY LIMIT 4 @ 120.
/// One trade at 100 for 4 shares; book has SELL 6 @ 100, no bids.
#[test]
fn scenario_limit_buy_partially_consumes_a_single_resting_ask() {
    let mut book = OrderBook::new("X");
    let b_order = Uuid::new_v4();
    book.add(Side::Sell, maker(b_order, 100, 10, 1));

    let result = MatchingEngine::sweep(&mut book, Side::Buy, 4, Some(120));

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].price, 100);
    assert_eq!(result.fills[0].quantity, 4);
    assert_eq!(result.fills[0].maker_order_id, b_order);
    assert_eq!(result.remaining_quantity, 0);

    assert_eq!(book.best_ask(), Some(100));
    assert_eq!(book.best_bid(), None);
    let snapshot = book.snapshot(10);
    assert_eq!(snapshot.asks[0].price, 100);
    assert_eq!(snapshot.asks[0].quantity, 6);
}

/// Scenario 2: continuing from (1), A submits BUY MARKET 7 against the
/// remaining SELL 6 @ 100. One trade for 6 shares, 1 discarded by the
/// caller (market orders never rest); book ends with no asks, no bids.
#[test]
fn scenario_market_buy_consumes_remaining_ask_and_leaves_residue_for_caller_to_discard() {
    let mut book = OrderBook::new("X");
    book.add(Side::Sell, maker(Uuid::new_v4(), 100, 6, 1));

    let result = MatchingEngine::sweep(&mut book, Side::Buy, 7, None);

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].price, 100);
    assert_eq!(result.fills[0].quantity, 6);
    assert_eq!(result.remaining_quantity, 1, "market residue is the caller's to discard, not the engine's");

    assert_eq!(book.best_ask(), None);
    assert_eq!(book.best_bid(), None);
}

/// Scenario 3: symbol Y. B posts SELL LIMIT 5 @ 50 then SELL LIMIT 5 @ 60.
/// A submits BUY LIMIT 8 @ 55. One trade for 5 @ 50; the remaining 3 does
/// not cross 60 so it stops there, leaving residue for the caller to rest
/// as a bid at 55 — top of book becomes bid 55 / ask 60.
#[test]
fn scenario_limit_buy_sweeps_one_level_and_stops_before_the_next() {
    let mut book = OrderBook::new("Y");
    book.add(Side::Sell, maker(Uuid::new_v4(), 50, 5, 1));
    book.add(Side::Sell, maker(Uuid::new_v4(), 60, 5, 2));

    let result = MatchingEngine::sweep(&mut book, Side::Buy, 8, Some(55));

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].price, 50);
    assert_eq!(result.fills[0].quantity, 5);
    assert_eq!(result.remaining_quantity, 3);

    // The processor would rest this residue as a bid; the engine itself
    // never adds it, so do that here to check the resulting top-of-book.
    book.add(Side::Buy, maker(Uuid::new_v4(), 55, result.remaining_quantity, 3));

    assert_eq!(book.best_bid(), Some(55));
    assert_eq!(book.best_ask(), Some(60));
    let snapshot = book.snapshot(10);
    assert_eq!(snapshot.bids[0].quantity, 3);
    assert_eq!(snapshot.asks[0].quantity, 5);
}

/// Scenario 4: B posts SELL LIMIT 5 @ 50. A submits BUY IOC 10 with limit
/// 45 — too low to cross. No trade, book unchanged; the caller is
/// responsible for expiring the IOC with reason IOC_UNFILLED rather than
/// resting it.
#[test]
fn scenario_ioc_with_no_crossable_liquidity_produces_no_fills_and_leaves_book_unchanged() {
    let mut book = OrderBook::new("X");
    book.add(Side::Sell, maker(Uuid::new_v4(), 50, 5, 1));

    let result = MatchingEngine::sweep(&mut book, Side::Buy, 10, Some(45));

    assert!(result.fills.is_empty());
    assert_eq!(result.remaining_quantity, 10);
    assert_eq!(book.best_ask(), Some(50));
    let snapshot = book.snapshot(10);
    assert_eq!(snapshot.asks[0].quantity, 5);
}

/// Cancelling a resting order removes it from its price level and empties
/// the level when it was the only occupant, matching the cancel-in-book
/// half of order cancellation (the durable half lives in the order
/// repository and is out of scope for this in-memory test).
#[test]
fn cancelling_the_only_order_at_a_price_level_empties_it() {
    let mut book = OrderBook::new("X");
    let order_id = Uuid::new_v4();
    book.add(Side::Buy, maker(order_id, 100, 5, 1));

    let cancelled = MatchingEngine::cancel_in_book(&mut book, Side::Buy, 100, order_id);

    assert!(cancelled);
    assert_eq!(book.best_bid(), None);
    assert!(!MatchingEngine::cancel_in_book(&mut book, Side::Buy, 100, order_id));
}
