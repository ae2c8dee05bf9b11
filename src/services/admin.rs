//! Admin Service (C11's core logic). Grounded on
//! `scripts/seed_treasury.py` and `api/admin.py`: create a trader with a
//! large cash balance, mint treasury shares, and lay a symmetric bid/ask
//! ladder around a par price so a symbol's book is non-empty at startup.
//! `ladder_levels`/`ladder_step` here replace the Python script's hardcoded
//! `DEFAULT_LADDER_RELATIVE` table per SPEC_FULL §6.1's parameterization.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{OrderType, Side};
use crate::repositories::{LedgerRepository, PositionRepository, RepositoryError, TraderRepository};
use crate::services::exchange::{ExchangeError, ExchangeService};
use crate::services::router::Router;

/// Default starting cash for admin/treasury accounts, matching
/// `api/admin.py`'s `initial_cash_in_cents` default of $10B.
pub const DEFAULT_ADMIN_CASH_CENTS: i64 = 1_000_000_000_000;

const LONG_TIF_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("ladder_levels and ladder_step must both be positive")]
    InvalidLadder,
}

pub struct AdminService {
    pool: PgPool,
    exchange: ExchangeService,
}

impl AdminService {
    pub fn new(pool: PgPool, router: Arc<Router>) -> Self {
        Self {
            exchange: ExchangeService::new(pool.clone(), router),
            pool,
        }
    }

    pub async fn create_trader(&self, initial_cash_cents: i64) -> Result<Uuid, AdminError> {
        Ok(self.exchange.create_trader(initial_cash_cents).await?)
    }

    pub async fn place_order(
        &self,
        trader_id: Uuid,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: i64,
        limit_price: Option<i64>,
        tif_seconds: i64,
    ) -> Result<Uuid, AdminError> {
        Ok(self
            .exchange
            .submit_order(trader_id, symbol, side, order_type, quantity, limit_price, tif_seconds)
            .await?)
    }

    /// Creates (or reuses) the treasury trader, mints `total_shares` of
    /// `symbol` into its position and ledger, then lays a symmetric LIMIT
    /// ladder: `ladder_levels` SELL orders above `par_price` and the same
    /// number of BUY orders below it, each stepping by `ladder_step`.
    pub async fn seed_treasury(
        &self,
        symbol: &str,
        par_price: i64,
        total_shares: i64,
        ladder_levels: i64,
        ladder_step: i64,
    ) -> Result<Uuid, AdminError> {
        if ladder_levels <= 0 || ladder_step <= 0 {
            return Err(AdminError::InvalidLadder);
        }

        let treasury_id = self.get_or_create_treasury().await?;
        self.mint_treasury_shares(treasury_id, symbol, total_shares).await?;

        let qty_per_level = (total_shares / (ladder_levels * 2)).max(1);
        for level in 1..=ladder_levels {
            let ask_price = par_price + level * ladder_step;
            if let Err(e) = self
                .exchange
                .submit_order(
                    treasury_id,
                    symbol,
                    Side::Sell,
                    OrderType::Limit,
                    qty_per_level,
                    Some(ask_price),
                    LONG_TIF_SECONDS,
                )
                .await
            {
                tracing::warn!(symbol, level, error = %e, "failed to place treasury ask rung");
            }

            let bid_price = par_price - level * ladder_step;
            if bid_price <= 0 {
                continue;
            }
            if let Err(e) = self
                .exchange
                .submit_order(
                    treasury_id,
                    symbol,
                    Side::Buy,
                    OrderType::Limit,
                    qty_per_level,
                    Some(bid_price),
                    LONG_TIF_SECONDS,
                )
                .await
            {
                tracing::warn!(symbol, level, error = %e, "failed to place treasury bid rung");
            }
        }

        Ok(treasury_id)
    }

    async fn get_or_create_treasury(&self) -> Result<Uuid, RepositoryError> {
        if let Some(trader) = TraderRepository::get_treasury(&self.pool).await? {
            return Ok(trader.trader_id);
        }
        let mut tx = self.pool.begin().await?;
        let trader = TraderRepository::create(&mut tx, DEFAULT_ADMIN_CASH_CENTS, true).await?;
        tx.commit().await?;
        Ok(trader.trader_id)
    }

    async fn mint_treasury_shares(&self, treasury_id: Uuid, symbol: &str, total_shares: i64) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        PositionRepository::update_for_buy(&mut tx, treasury_id, symbol, total_shares, 0).await?;
        LedgerRepository::initialize_shares(&mut tx, treasury_id, symbol, total_shares).await?;
        tx.commit().await?;
        Ok(())
    }
}
