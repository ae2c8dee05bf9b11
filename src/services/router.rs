//! Router (C4).
//!
//! Grounded on `engine/order_router.py`'s `OrderRouter`: one dispatch point
//! mapping a symbol to its processor, with startup rebuild and shutdown
//! draining. The Python version calls `get_order_book` synchronously because
//! asyncio is single-threaded; here cross-task reads go through the same
//! mpsc inbox carrying a `oneshot` reply so the book is never touched from
//! outside its owning task.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::CancelReason;
use crate::services::book::{BookState, DepthSnapshot};
use crate::services::processor::{ProcessorMessage, SymbolProcessor};

const INBOX_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("processor inbox closed")]
    InboxClosed,

    #[error("processor inbox full")]
    InboxFull,
}

struct ProcessorHandle {
    inbox: mpsc::Sender<ProcessorMessage>,
    join: JoinHandle<()>,
}

/// Owns one Symbol Processor per trading symbol. Submit/cancel are
/// fire-and-forget from the caller's perspective beyond enqueueing; the
/// processor applies back-pressure via the bounded channel's capacity.
pub struct Router {
    processors: HashMap<String, ProcessorHandle>,
}

impl Router {
    /// Constructs one processor per symbol, runs its startup rebuild, and
    /// spawns its loop. Startup order does not matter across symbols — each
    /// rebuild only touches its own book and its own durable rows.
    pub async fn start(pool: PgPool, symbols: &[String]) -> Result<Self, crate::repositories::RepositoryError> {
        let mut processors = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            let mut processor = SymbolProcessor::new(symbol.clone(), pool.clone(), rx);
            processor.rebuild().await?;
            let join = tokio::spawn(processor.run());
            processors.insert(symbol.clone(), ProcessorHandle { inbox: tx, join });
            tracing::info!(symbol = %symbol, "symbol processor started");
        }
        Ok(Self { processors })
    }

    fn handle(&self, symbol: &str) -> Result<&ProcessorHandle, RouterError> {
        self.processors
            .get(symbol)
            .ok_or_else(|| RouterError::UnknownSymbol(symbol.to_string()))
    }

    pub async fn submit(&self, symbol: &str, order_id: Uuid) -> Result<(), RouterError> {
        let handle = self.handle(symbol)?;
        handle
            .inbox
            .send(ProcessorMessage::NewOrder(order_id))
            .await
            .map_err(|_| RouterError::InboxClosed)
    }

    pub async fn cancel(&self, symbol: &str, order_id: Uuid, reason: CancelReason) -> Result<(), RouterError> {
        let handle = self.handle(symbol)?;
        handle
            .inbox
            .send(ProcessorMessage::Cancel(order_id, reason))
            .await
            .map_err(|_| RouterError::InboxClosed)
    }

    pub async fn get_book(&self, symbol: &str) -> Result<DepthSnapshot, RouterError> {
        let handle = self.handle(symbol)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .inbox
            .send(ProcessorMessage::Snapshot(reply_tx))
            .await
            .map_err(|_| RouterError::InboxClosed)?;
        reply_rx.await.map_err(|_| RouterError::InboxClosed)
    }

    pub async fn get_book_state(&self, symbol: &str) -> Result<BookState, RouterError> {
        let handle = self.handle(symbol)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .inbox
            .send(ProcessorMessage::BookState(reply_tx))
            .await
            .map_err(|_| RouterError::InboxClosed)?;
        reply_rx.await.map_err(|_| RouterError::InboxClosed)
    }

    pub fn list_symbols(&self) -> Vec<String> {
        self.processors.keys().cloned().collect()
    }

    pub fn is_known_symbol(&self, symbol: &str) -> bool {
        self.processors.contains_key(symbol)
    }

    /// Drops every inbox sender (closing the channels, which ends each
    /// processor's `recv` loop) and joins every worker. Called before the
    /// expiration daemon and outbox publisher are stopped (SPEC_FULL §5).
    pub async fn shutdown(self) {
        let mut joins = Vec::with_capacity(self.processors.len());
        for (symbol, handle) in self.processors {
            drop(handle.inbox);
            joins.push((symbol, handle.join));
        }
        for (symbol, join) in joins {
            if let Err(e) = join.await {
                tracing::error!(symbol = %symbol, error = %e, "processor task panicked during shutdown");
            }
        }
    }
}
