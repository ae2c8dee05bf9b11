//! Symbol Processor (C3).
//!
//! Grounded on `engine/symbol_order_processor.py`'s `SymbolOrderProcessor`:
//! one `asyncio.Queue` inbox, one transaction per message, a single
//! `_process_new_order`/`_process_cancellation` dispatch. Here the inbox is
//! a bounded `tokio::sync::mpsc` channel and the loop runs as one
//! `tokio::spawn`ed task per symbol, per SPEC_FULL §5's concrete runtime
//! mapping. Book reads (`Snapshot`/`BookState`) are additional message
//! variants answered over a `oneshot` reply channel, so the book stays
//! exclusively owned by this task even though external readers need its
//! state (SPEC_FULL §4.9).

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::models::{
    BookStatePayload, CancelReason, NewTrade, Order, OrderType, Side,
};
use crate::repositories::{
    LedgerRepository, OrderRepository, OutboxRepository, PositionRepository, RepositoryError,
    TradeRepository,
};
use crate::services::book::{BookEntry, BookState, DepthSnapshot, OrderBook};
use crate::services::matching::MatchingEngine;

/// Bound on retries for a single inbox message after a matching-time
/// settlement rejection or a transient storage failure, per SPEC_FULL §4.3
/// ("persistent storage failures cause the message to be retried after a
/// bounded backoff").
const MAX_PROCESSING_RETRIES: u32 = 5;
const PROCESSING_RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Outcome of one attempt at processing a new-order message.
enum ProcessingOutcome {
    Committed,
    /// A fill's settlement step hit a hard business-rule violation
    /// (currently only `PositionRepository::update_for_sell`'s
    /// `InsufficientShares`) that the transaction has already been rolled
    /// back for. `offending_order_id` is the sell-side order (maker or
    /// taker) whose position could not cover the fill.
    SettlementRejected { offending_order_id: Uuid },
}

pub enum ProcessorMessage {
    NewOrder(Uuid),
    Cancel(Uuid, CancelReason),
    Snapshot(oneshot::Sender<DepthSnapshot>),
    BookState(oneshot::Sender<BookState>),
}

pub struct SymbolProcessor {
    symbol: String,
    pool: PgPool,
    book: OrderBook,
    inbox: mpsc::Receiver<ProcessorMessage>,
}

impl SymbolProcessor {
    pub fn new(symbol: String, pool: PgPool, inbox: mpsc::Receiver<ProcessorMessage>) -> Self {
        Self {
            book: OrderBook::new(symbol.clone()),
            symbol,
            pool,
            inbox,
        }
    }

    /// Loads every PENDING/PARTIAL order for this symbol, ascending by
    /// sequence, and adds each to the book — exact price-time priority
    /// reconstruction (SPEC_FULL §4.3 "Startup rebuild").
    pub async fn rebuild(&mut self) -> Result<(), RepositoryError> {
        self.reload_book().await?;
        tracing::info!(symbol = %self.symbol, orders = self.book.book_state().bid_size + self.book.book_state().ask_size, "rebuilt book from durable state");
        Ok(())
    }

    /// Discards the in-memory book and reconstructs it from durable state.
    /// Used both for the startup rebuild and, per SPEC_FULL §4.3(4), to
    /// resynchronize after a transaction that mutated the book in memory
    /// rolls back without committing those mutations.
    async fn reload_book(&mut self) -> Result<(), RepositoryError> {
        let orders = OrderRepository::get_unfilled(&self.pool, &self.symbol).await?;
        let mut book = OrderBook::new(self.symbol.clone());
        for order in orders {
            if let Some(price) = order.limit_price {
                book.add(
                    order.side,
                    BookEntry {
                        order_id: order.order_id,
                        trader_id: order.trader_id,
                        price,
                        remaining_quantity: order.remaining_quantity(),
                        sequence: order.sequence,
                    },
                );
            }
        }
        if let Some(last_trade_price) = self.book.last_trade_price() {
            book.set_last_trade_price(last_trade_price);
        }
        self.book = book;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn run(mut self) {
        while let Some(message) = self.inbox.recv().await {
            match message {
                ProcessorMessage::NewOrder(order_id) => {
                    if let Err(e) = self.process_new_order(order_id).await {
                        tracing::error!(order_id = %order_id, error = %e, "failed to process new order");
                    }
                }
                ProcessorMessage::Cancel(order_id, reason) => {
                    if let Err(e) = self.process_cancel(order_id, reason).await {
                        tracing::error!(order_id = %order_id, error = %e, "failed to process cancel");
                    }
                }
                ProcessorMessage::Snapshot(reply) => {
                    let _ = reply.send(self.book.snapshot(50));
                }
                ProcessorMessage::BookState(reply) => {
                    let _ = reply.send(self.book.book_state());
                }
            }
        }
        tracing::info!(symbol = %self.symbol, "processor inbox closed, loop exiting");
    }

    /// Drives one new-order message to a terminal outcome, retrying across
    /// attempts when a transaction rolls back: a matching-time settlement
    /// rejection cancels the offending order and retries the sweep against
    /// the corrected book, while a transient storage failure reloads the
    /// book and retries after a bounded backoff (SPEC_FULL §4.3(4)).
    async fn process_new_order(&mut self, order_id: Uuid) -> Result<(), RepositoryError> {
        let mut attempt = 0u32;
        loop {
            match self.try_process_new_order(order_id).await {
                Ok(ProcessingOutcome::Committed) => return Ok(()),
                Ok(ProcessingOutcome::SettlementRejected { offending_order_id }) => {
                    tracing::warn!(
                        order_id = %order_id,
                        offending_order_id = %offending_order_id,
                        attempt,
                        "matching-time settlement rejected, cancelling offending order and resyncing book"
                    );
                    self.reload_book().await?;
                    self.cancel_for_matching_failure(offending_order_id).await?;
                    if offending_order_id == order_id {
                        // The incoming order itself failed settlement and is
                        // now CANCELLED with no fills; nothing left to retry.
                        return Ok(());
                    }
                    attempt += 1;
                    if attempt > MAX_PROCESSING_RETRIES {
                        tracing::error!(order_id = %order_id, "exceeded settlement-retry budget, leaving order for the next message");
                        return Ok(());
                    }
                }
                Err(e) => {
                    self.reload_book().await?;
                    attempt += 1;
                    if attempt > MAX_PROCESSING_RETRIES {
                        return Err(e);
                    }
                    tracing::warn!(order_id = %order_id, attempt, error = %e, "transient storage failure processing order, retrying after backoff");
                    tokio::time::sleep(PROCESSING_RETRY_BACKOFF * attempt).await;
                }
            }
        }
    }

    async fn try_process_new_order(&mut self, order_id: Uuid) -> Result<ProcessingOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = match OrderRepository::get_for_update(&mut tx, order_id).await? {
            Some(order) => order,
            None => {
                tracing::warn!(order_id = %order_id, "new-order message for unknown order, skipping");
                tx.rollback().await?;
                return Ok(ProcessingOutcome::Committed);
            }
        };

        if order.status.is_terminal() {
            tracing::warn!(order_id = %order_id, "new-order message for already-terminal order, skipping");
            tx.rollback().await?;
            return Ok(ProcessingOutcome::Committed);
        }

        let guard = match order.order_type {
            OrderType::Limit => order.limit_price,
            OrderType::Market => None,
            OrderType::Ioc => order.limit_price,
        };

        let sweep = MatchingEngine::sweep(&mut self.book, order.side, order.remaining_quantity(), guard);

        for fill in &sweep.fills {
            let (buy_order_id, sell_order_id, buyer_id, seller_id) = match order.side {
                Side::Buy => (order.order_id, fill.maker_order_id, order.trader_id, fill.maker_trader_id),
                Side::Sell => (fill.maker_order_id, order.order_id, fill.maker_trader_id, order.trader_id),
            };

            let new_trade = NewTrade {
                buy_order_id,
                sell_order_id,
                symbol: self.symbol.clone(),
                price: fill.price,
                quantity: fill.quantity,
                buyer_id,
                seller_id,
                taker_order_id: order.order_id,
                maker_order_id: fill.maker_order_id,
            };
            let executed_at = chrono::Utc::now();
            let trade = TradeRepository::record(&mut tx, &new_trade, executed_at).await?;
            LedgerRepository::post_trade(&mut tx, &trade).await?;
            PositionRepository::update_for_buy(&mut tx, buyer_id, &self.symbol, fill.quantity, fill.price).await?;
            match PositionRepository::update_for_sell(&mut tx, seller_id, &self.symbol, fill.quantity).await {
                Ok(_) => {}
                Err(RepositoryError::InsufficientShares { .. }) => {
                    // The seller's resting order promised shares it no
                    // longer has (raced against another sell of the same
                    // position). Roll back the whole message so none of
                    // this fill's partial settlement is ever observable,
                    // and let the caller cancel the seller's order and
                    // retry the sweep without it.
                    tx.rollback().await?;
                    return Ok(ProcessingOutcome::SettlementRejected {
                        offending_order_id: sell_order_id,
                    });
                }
                Err(other) => return Err(other),
            }
            OrderRepository::update_filled(&mut tx, buy_order_id, fill.quantity).await?;
            OrderRepository::update_filled(&mut tx, sell_order_id, fill.quantity).await?;

            let state = self.book.book_state();
            let book_payload = BookStatePayload {
                best_bid: state.best_bid,
                best_ask: state.best_ask,
                bid_size: state.bid_size,
                ask_size: state.ask_size,
            };
            OutboxRepository::queue_trade_event(&mut tx, &trade, &book_payload).await?;
            self.book.set_last_trade_price(trade.price);

            metrics::counter!(crate::metrics::names::TRADES_EXECUTED_TOTAL, crate::metrics::labels::SYMBOL => self.symbol.clone()).increment(1);
        }

        if sweep.remaining_quantity > 0 {
            match order.order_type {
                OrderType::Limit => {
                    if let Some(price) = order.limit_price {
                        self.book.add(
                            order.side,
                            BookEntry {
                                order_id: order.order_id,
                                trader_id: order.trader_id,
                                price,
                                remaining_quantity: sweep.remaining_quantity,
                                sequence: order.sequence,
                            },
                        );
                    }
                }
                OrderType::Market => {
                    tracing::debug!(order_id = %order_id, discarded = sweep.remaining_quantity, "market order residue discarded");
                }
                OrderType::Ioc => {
                    OrderRepository::cancel(&mut tx, order_id, CancelReason::IocUnfilled).await?;
                    metrics::counter!(crate::metrics::names::ORDERS_EXPIRED_TOTAL, crate::metrics::labels::SYMBOL => self.symbol.clone()).increment(1);
                }
            }
        }

        tx.commit().await?;
        Ok(ProcessingOutcome::Committed)
    }

    /// Cancels an order that failed settlement at matching time (SPEC_FULL
    /// §7: "if the violation is detected only at matching time, the order
    /// is recorded as CANCELLED"). `InsufficientFunds` is the only
    /// matching-time insufficiency reason the model carries; it covers both
    /// cash and share shortfalls. Runs in its own transaction since the one
    /// that discovered the violation has already been rolled back.
    async fn cancel_for_matching_failure(&mut self, order_id: Uuid) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        match OrderRepository::cancel(&mut tx, order_id, CancelReason::InsufficientFunds).await {
            Ok(order) => {
                if order.order_type == OrderType::Limit {
                    if let Some(price) = order.limit_price {
                        MatchingEngine::cancel_in_book(&mut self.book, order.side, price, order_id);
                    }
                }
                tx.commit().await?;
                metrics::counter!(crate::metrics::names::ORDERS_CANCELLED_TOTAL, crate::metrics::labels::SYMBOL => self.symbol.clone()).increment(1);
                Ok(())
            }
            Err(RepositoryError::OrderNotFound(_)) | Err(RepositoryError::AlreadyTerminal(_)) => {
                tx.rollback().await?;
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    async fn process_cancel(&mut self, order_id: Uuid, reason: CancelReason) -> Result<(), RepositoryError> {
        match self.try_process_cancel(order_id, reason).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.reload_book().await?;
                Err(e)
            }
        }
    }

    async fn try_process_cancel(&mut self, order_id: Uuid, reason: CancelReason) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order: Order = match OrderRepository::cancel(&mut tx, order_id, reason).await {
            Ok(order) => order,
            Err(RepositoryError::OrderNotFound(_)) | Err(RepositoryError::AlreadyTerminal(_)) => {
                tracing::warn!(order_id = %order_id, "cannot cancel order, skipping");
                tx.rollback().await?;
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        if order.order_type == OrderType::Limit {
            if let Some(price) = order.limit_price {
                MatchingEngine::cancel_in_book(&mut self.book, order.side, price, order_id);
            }
        }

        tx.commit().await?;
        if reason == CancelReason::Expired {
            metrics::counter!(crate::metrics::names::ORDERS_EXPIRED_TOTAL, crate::metrics::labels::SYMBOL => self.symbol.clone()).increment(1);
        } else {
            metrics::counter!(crate::metrics::names::ORDERS_CANCELLED_TOTAL, crate::metrics::labels::SYMBOL => self.symbol.clone()).increment(1);
        }
        Ok(())
    }
}
