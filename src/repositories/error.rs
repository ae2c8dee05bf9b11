use thiserror::Error;

/// Errors raised by the data-access layer (C5). Every write method here is
/// non-committing: callers own the transaction and decide whether to commit
/// or roll back on error, per SPEC_FULL §4.5.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("order {0} not found")]
    OrderNotFound(uuid::Uuid),

    #[error("order {0} is already in a terminal state")]
    AlreadyTerminal(uuid::Uuid),

    #[error("fill of {delta} would exceed order {order_id} quantity ({quantity}, already filled {filled})")]
    FillExceedsQuantity {
        order_id: uuid::Uuid,
        delta: i64,
        filled: i64,
        quantity: i64,
    },

    #[error("trader {trader_id} has insufficient shares of {symbol}: has {have}, needs {need}")]
    InsufficientShares {
        trader_id: uuid::Uuid,
        symbol: String,
        have: i64,
        need: i64,
    },
}
