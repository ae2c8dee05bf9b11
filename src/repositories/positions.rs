//! Position repository (C5/C6). Grounded on
//! `database/repositories_positions.py::update_for_buy/update_for_sell`:
//! weighted average cost on buys over the accumulated position (not
//! per-lot), floor division in integer cents, and a hard rejection of any
//! sell that would drive quantity negative (shorting is a Non-goal).

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::Position;

use super::error::RepositoryError;

/// `new_qty = old_qty + qty`; `new_avg = floor((old_qty*old_avg + qty*price) / new_qty)`.
/// Matches `repositories_positions.py::update_for_buy`'s weighted average
/// over the accumulated position, not per-lot.
fn weighted_average_cost(old_quantity: i64, old_avg_cost: i64, buy_quantity: i64, buy_price: i64) -> (i64, i64) {
    let new_quantity = old_quantity + buy_quantity;
    let new_avg_cost = if new_quantity > 0 {
        (old_quantity * old_avg_cost + buy_quantity * buy_price) / new_quantity
    } else {
        0
    };
    (new_quantity, new_avg_cost)
}

pub struct PositionRepository;

impl PositionRepository {
    async fn get_for_update(
        tx: &mut Transaction<'_, Postgres>,
        trader_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, RepositoryError> {
        let position = sqlx::query_as::<_, Position>(
            "SELECT * FROM positions WHERE trader_id = $1 AND symbol = $2 FOR UPDATE",
        )
        .bind(trader_id)
        .bind(symbol)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(position)
    }

    pub async fn update_for_buy(
        tx: &mut Transaction<'_, Postgres>,
        trader_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: i64,
    ) -> Result<Position, RepositoryError> {
        let existing = Self::get_for_update(tx, trader_id, symbol).await?;
        let (old_quantity, old_avg_cost) = existing.as_ref().map(|p| (p.quantity, p.avg_cost)).unwrap_or((0, 0));
        let (new_quantity, new_avg_cost) = weighted_average_cost(old_quantity, old_avg_cost, quantity, price);

        let position = sqlx::query_as::<_, Position>(
            r#"
            INSERT INTO positions (trader_id, symbol, quantity, avg_cost, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (trader_id, symbol)
            DO UPDATE SET quantity = $3, avg_cost = $4, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(trader_id)
        .bind(symbol)
        .bind(new_quantity)
        .bind(new_avg_cost)
        .fetch_one(&mut **tx)
        .await?;
        Ok(position)
    }

    pub async fn update_for_sell(
        tx: &mut Transaction<'_, Postgres>,
        trader_id: Uuid,
        symbol: &str,
        quantity: i64,
    ) -> Result<Position, RepositoryError> {
        let existing = Self::get_for_update(tx, trader_id, symbol).await?;
        let have = existing.as_ref().map(|p| p.quantity).unwrap_or(0);
        if have < quantity {
            return Err(RepositoryError::InsufficientShares {
                trader_id,
                symbol: symbol.to_string(),
                have,
                need: quantity,
            });
        }
        let new_quantity = have - quantity;

        let position = sqlx::query_as::<_, Position>(
            r#"
            UPDATE positions
            SET quantity = $1, updated_at = now()
            WHERE trader_id = $2 AND symbol = $3
            RETURNING *
            "#,
        )
        .bind(new_quantity)
        .bind(trader_id)
        .bind(symbol)
        .fetch_one(&mut **tx)
        .await?;
        Ok(position)
    }

    pub async fn get(
        pool: &sqlx::PgPool,
        trader_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, RepositoryError> {
        let position = sqlx::query_as::<_, Position>(
            "SELECT * FROM positions WHERE trader_id = $1 AND symbol = $2",
        )
        .bind(trader_id)
        .bind(symbol)
        .fetch_optional(pool)
        .await?;
        Ok(position)
    }

    /// Non-zero positions for a trader, used by the portfolio read service.
    pub async fn list_nonzero(
        pool: &sqlx::PgPool,
        trader_id: Uuid,
    ) -> Result<Vec<Position>, RepositoryError> {
        let positions = sqlx::query_as::<_, Position>(
            "SELECT * FROM positions WHERE trader_id = $1 AND quantity > 0",
        )
        .bind(trader_id)
        .fetch_all(pool)
        .await?;
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_buy_sets_avg_cost_to_fill_price() {
        let (qty, avg) = weighted_average_cost(0, 0, 4, 100);
        assert_eq!(qty, 4);
        assert_eq!(avg, 100);
    }

    #[test]
    fn second_buy_blends_weighted_average_over_accumulated_position() {
        // 4 @ 100 then 6 @ 150 -> (4*100 + 6*150) / 10 = 130
        let (qty, avg) = weighted_average_cost(4, 100, 6, 150);
        assert_eq!(qty, 10);
        assert_eq!(avg, 130);
    }

    #[test]
    fn weighted_average_floors_integer_division() {
        // 1 @ 1 then 1 @ 2 -> (1 + 2) / 2 = 1 (floored from 1.5)
        let (qty, avg) = weighted_average_cost(1, 1, 1, 2);
        assert_eq!(qty, 2);
        assert_eq!(avg, 1);
    }
}
