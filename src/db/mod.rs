//! Durable storage bootstrap (C10, ambient).
//!
//! Thin wrapper over a `sqlx::PgPool`: connect with a bounded pool and
//! surface it to every repository and service as a plain `&PgPool`/
//! `Transaction`. No ORM, no query builder beyond `sqlx` itself, matching
//! the teacher's `db/timescale.rs` connection style minus the
//! TimescaleDB-specific continuous-aggregate surface this system has no
//! use for (no candlestick hypertables here; `TradeRepository::ohlc`
//! computes OHLC from the plain `trades` table).

use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{Pool, Transaction};

const MAX_CONNECTIONS: u32 = 20;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
