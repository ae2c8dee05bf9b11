//! Order repository (C5). Every write method here is non-committing: the
//! caller supplies the transaction and controls commit/rollback, so the
//! Symbol Processor (C3) can batch an entire message's effects atomically.
//!
//! Grounded on `database/repositories_orders.py` in the retained original
//! source, translated statement-for-statement.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::{CancelReason, NewOrderRequest, Order, OrderStatus};

use super::error::RepositoryError;

pub struct OrderRepository;

impl OrderRepository {
    /// Atomically increments and returns the per-symbol sequence counter,
    /// seeding it on first use. This is the authoritative price-time
    /// tiebreaker (SPEC_FULL §3/§5).
    pub async fn next_sequence(
        tx: &mut Transaction<'_, Postgres>,
        symbol: &str,
    ) -> Result<i64, RepositoryError> {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequence_counters (symbol, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (symbol)
            DO UPDATE SET last_sequence = sequence_counters.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(symbol)
        .fetch_one(&mut **tx)
        .await?;
        Ok(sequence)
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        request: &NewOrderRequest,
        expires_at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let sequence = Self::next_sequence(tx, &request.symbol).await?;
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_id, trader_id, symbol, side, order_type, quantity,
                limit_price, filled_quantity, status, cancel_reason,
                sequence, tif_seconds, expires_at, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, 0, $8, NULL,
                $9, $10, $11, now(), now()
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.trader_id)
        .bind(&request.symbol)
        .bind(request.side)
        .bind(request.order_type)
        .bind(request.quantity)
        .bind(request.limit_price)
        .bind(OrderStatus::Pending)
        .bind(sequence)
        .bind(request.tif_seconds)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await?;
        Ok(order)
    }

    /// Reads the order with a row lock so concurrent fills against it are
    /// serialized for the duration of the caller's transaction.
    pub async fn get_for_update(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(order)
    }

    pub async fn get(pool: &sqlx::PgPool, order_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
        Ok(order)
    }

    /// Adds `delta` to `filled_quantity`, recomputes status, and returns the
    /// updated row. Errors if the fill would exceed the order's quantity.
    pub async fn update_filled(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        delta: i64,
    ) -> Result<Order, RepositoryError> {
        let current = Self::get_for_update(tx, order_id)
            .await?
            .ok_or(RepositoryError::OrderNotFound(order_id))?;
        let new_filled = current.filled_quantity + delta;
        if new_filled > current.quantity {
            return Err(RepositoryError::FillExceedsQuantity {
                order_id,
                delta,
                filled: current.filled_quantity,
                quantity: current.quantity,
            });
        }
        let new_status = OrderStatus::from_fill(new_filled, current.quantity);
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET filled_quantity = $1, status = $2, updated_at = now()
            WHERE order_id = $3
            RETURNING *
            "#,
        )
        .bind(new_filled)
        .bind(new_status)
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(order)
    }

    /// Flips a non-terminal order to CANCELLED (reason USER) or EXPIRED
    /// (reason EXPIRED). Errors if the order is already terminal.
    pub async fn cancel(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        reason: CancelReason,
    ) -> Result<Order, RepositoryError> {
        let current = Self::get_for_update(tx, order_id)
            .await?
            .ok_or(RepositoryError::OrderNotFound(order_id))?;
        if current.status.is_terminal() {
            return Err(RepositoryError::AlreadyTerminal(order_id));
        }
        let status = if reason == CancelReason::User {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Expired
        };
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1, cancel_reason = $2, updated_at = now()
            WHERE order_id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(reason)
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(order)
    }

    /// Orders with durable status in {PENDING, PARTIAL}, sorted ascending by
    /// sequence — used both for startup rebuild and for inspection.
    pub async fn get_unfilled(pool: &sqlx::PgPool, symbol: &str) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE symbol = $1 AND status IN ('PENDING', 'PARTIAL')
            ORDER BY sequence ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(pool)
        .await?;
        Ok(orders)
    }

    pub async fn get_trader_unfilled(
        pool: &sqlx::PgPool,
        trader_id: Uuid,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE trader_id = $1 AND status IN ('PENDING', 'PARTIAL')
            ORDER BY sequence ASC
            "#,
        )
        .bind(trader_id)
        .fetch_all(pool)
        .await?;
        Ok(orders)
    }

    /// Orders past their time-in-force, still live. Used by the expiration
    /// daemon (C7).
    pub async fn get_expired(pool: &sqlx::PgPool, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE expires_at <= now() AND status IN ('PENDING', 'PARTIAL')
            ORDER BY expires_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_quantity_reflects_fills() {
        let order = Order {
            order_id: Uuid::nil(),
            trader_id: Uuid::nil(),
            symbol: "X".into(),
            side: crate::models::Side::Buy,
            order_type: crate::models::OrderType::Limit,
            quantity: 10,
            limit_price: Some(100),
            filled_quantity: 4,
            status: OrderStatus::Partial,
            cancel_reason: None,
            sequence: 1,
            tif_seconds: 60,
            expires_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(order.remaining_quantity(), 6);
    }
}
