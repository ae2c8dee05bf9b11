//! Trade repository (C5/C9). `record` is non-committing; the read methods
//! run standalone against the pool per SPEC_FULL §4.5.
//!
//! OHLC bucketing is grounded on
//! `database/repositories_trades.py::get_ohlc_history`: native `date_trunc`
//! for "1h"/"1d"/"1w", and hourly truncation followed by application-side
//! six-bucket coalescing for "6h" (see DESIGN.md's Open Question resolution
//! for the exact anchor chosen).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{NewTrade, OhlcCandle, Trade};

use super::error::RepositoryError;

pub struct TradeRepository;

#[derive(Debug, FromRow)]
struct OhlcRow {
    bucket_start: DateTime<Utc>,
    open: i64,
    high: i64,
    low: i64,
    close: i64,
    volume: i64,
}

impl TradeRepository {
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        trade: &NewTrade,
        executed_at: DateTime<Utc>,
    ) -> Result<Trade, RepositoryError> {
        let trade = sqlx::query_as::<_, Trade>(
            r#"
            INSERT INTO trades (
                trade_id, buy_order_id, sell_order_id, symbol, price, quantity,
                buyer_id, seller_id, taker_order_id, maker_order_id, executed_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now())
            RETURNING trade_id, buy_order_id, sell_order_id, symbol, price, quantity,
                      buyer_id, seller_id, taker_order_id, maker_order_id, executed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trade.buy_order_id)
        .bind(trade.sell_order_id)
        .bind(&trade.symbol)
        .bind(trade.price)
        .bind(trade.quantity)
        .bind(trade.buyer_id)
        .bind(trade.seller_id)
        .bind(trade.taker_order_id)
        .bind(trade.maker_order_id)
        .bind(executed_at)
        .fetch_one(&mut **tx)
        .await?;
        Ok(trade)
    }

    pub async fn recent(
        pool: &sqlx::PgPool,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<Trade>, RepositoryError> {
        let limit = limit.clamp(1, 500);
        let trades = sqlx::query_as::<_, Trade>(
            r#"
            SELECT trade_id, buy_order_id, sell_order_id, symbol, price, quantity,
                   buyer_id, seller_id, taker_order_id, maker_order_id, executed_at
            FROM trades
            WHERE symbol = $1
            ORDER BY executed_at DESC
            LIMIT $2
            "#,
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(trades)
    }

    pub async fn by_trader(
        pool: &sqlx::PgPool,
        trader_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Trade>, RepositoryError> {
        let limit = limit.clamp(1, 500);
        let trades = sqlx::query_as::<_, Trade>(
            r#"
            SELECT trade_id, buy_order_id, sell_order_id, symbol, price, quantity,
                   buyer_id, seller_id, taker_order_id, maker_order_id, executed_at
            FROM trades
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY executed_at DESC
            LIMIT $2
            "#,
        )
        .bind(trader_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(trades)
    }

    /// `bucket` is one of "1h", "6h", "1d", "1w". "6h" is computed by
    /// fetching hourly buckets and coalescing six at a time in application
    /// code, exactly as the original source does.
    pub async fn ohlc(
        pool: &sqlx::PgPool,
        symbol: &str,
        bucket: &str,
        periods: i64,
    ) -> Result<Vec<OhlcCandle>, RepositoryError> {
        let (trunc, fetch_periods) = match bucket {
            "1h" => ("hour", periods),
            "6h" => ("hour", periods * 6),
            "1d" => ("day", periods),
            "1w" => ("week", periods),
            other => {
                tracing::warn!(bucket = other, "unknown ohlc bucket, defaulting to day");
                ("day", periods)
            }
        };

        let rows = sqlx::query_as::<_, OhlcRow>(
            r#"
            WITH time_periods AS (
                SELECT
                    date_trunc($2, executed_at) AS bucket_start,
                    MIN(executed_at) AS period_start,
                    MAX(executed_at) AS period_end
                FROM trades
                WHERE symbol = $1
                GROUP BY date_trunc($2, executed_at)
            ),
            period_ohlc AS (
                SELECT
                    tp.bucket_start,
                    (SELECT price FROM trades t WHERE t.symbol = $1 AND t.executed_at = tp.period_start ORDER BY t.executed_at LIMIT 1) AS open,
                    (SELECT price FROM trades t WHERE t.symbol = $1 AND t.executed_at = tp.period_end ORDER BY t.executed_at DESC LIMIT 1) AS close,
                    (SELECT MAX(price) FROM trades t WHERE t.symbol = $1 AND date_trunc($2, t.executed_at) = tp.bucket_start) AS high,
                    (SELECT MIN(price) FROM trades t WHERE t.symbol = $1 AND date_trunc($2, t.executed_at) = tp.bucket_start) AS low,
                    (SELECT SUM(quantity) FROM trades t WHERE t.symbol = $1 AND date_trunc($2, t.executed_at) = tp.bucket_start) AS volume
                FROM time_periods tp
            )
            SELECT bucket_start, open, high, low, close, volume
            FROM period_ohlc
            ORDER BY bucket_start DESC
            LIMIT $3
            "#,
        )
        .bind(symbol)
        .bind(trunc)
        .bind(fetch_periods)
        .fetch_all(pool)
        .await?;

        // Rows arrive newest-first; put them oldest-first before coalescing
        // so six-bucket grouping starts from the oldest bucket in the window.
        let mut ascending: Vec<OhlcRow> = rows;
        ascending.reverse();

        let candles: Vec<OhlcCandle> = if bucket == "6h" {
            coalesce_six_hourly(ascending)
        } else {
            ascending
                .into_iter()
                .map(|r| OhlcCandle {
                    bucket_start: r.bucket_start,
                    open: r.open,
                    high: r.high,
                    low: r.low,
                    close: r.close,
                    volume: r.volume,
                })
                .collect()
        };
        Ok(candles)
    }
}

/// Greedily groups consecutive hourly buckets six at a time, starting from
/// the oldest bucket returned by the query window. Not aligned to a global
/// epoch anchor — see DESIGN.md.
fn coalesce_six_hourly(hourly: Vec<OhlcRow>) -> Vec<OhlcCandle> {
    hourly
        .chunks(6)
        .map(|group| {
            let first = &group[0];
            let last = &group[group.len() - 1];
            OhlcCandle {
                bucket_start: first.bucket_start,
                open: first.open,
                close: last.close,
                high: group.iter().map(|r| r.high).max().unwrap_or(first.high),
                low: group.iter().map(|r| r.low).min().unwrap_or(first.low),
                volume: group.iter().map(|r| r.volume).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hour: u32, open: i64, high: i64, low: i64, close: i64, volume: i64) -> OhlcRow {
        OhlcRow {
            bucket_start: "2026-01-01T00:00:00Z"
                .parse::<DateTime<Utc>>()
                .unwrap()
                + chrono::Duration::hours(hour as i64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn coalesces_six_hourly_buckets_into_one_candle() {
        let hourly = vec![
            row(0, 100, 110, 95, 105, 10),
            row(1, 105, 108, 100, 102, 5),
            row(2, 102, 115, 101, 112, 7),
            row(3, 112, 112, 90, 95, 20),
            row(4, 95, 100, 94, 98, 3),
            row(5, 98, 99, 96, 97, 2),
        ];
        let candles = coalesce_six_hourly(hourly);
        assert_eq!(candles.len(), 1);
        let candle = &candles[0];
        assert_eq!(candle.open, 100);
        assert_eq!(candle.close, 97);
        assert_eq!(candle.high, 115);
        assert_eq!(candle.low, 90);
        assert_eq!(candle.volume, 47);
    }

    #[test]
    fn partial_final_group_is_kept_as_its_own_candle() {
        let hourly = vec![
            row(0, 100, 105, 95, 100, 1),
            row(1, 100, 106, 99, 101, 1),
            row(2, 101, 103, 98, 100, 1),
            row(3, 100, 104, 97, 103, 1),
            row(4, 103, 107, 96, 104, 1),
            row(5, 104, 108, 95, 105, 1),
            row(6, 105, 109, 100, 106, 1),
        ];
        let candles = coalesce_six_hourly(hourly);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open, 105);
        assert_eq!(candles[1].close, 106);
    }
}
