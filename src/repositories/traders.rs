//! Trader repository (C5). Grounded on
//! `database/repositories_traders.py`, minus the hard-delete method — see
//! DESIGN.md's Open Question resolution: trader accounts are never
//! hard-deleted in this system, so no delete surface is exposed.

use uuid::Uuid;

use crate::models::TraderAccount;

use super::error::RepositoryError;
use super::ledger::LedgerRepository;

pub struct TraderRepository;

impl TraderRepository {
    /// Creates a trader and, in the same transaction, posts the funding
    /// ledger entry for its starting cash balance.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        initial_cash_cents: i64,
        is_admin: bool,
    ) -> Result<TraderAccount, RepositoryError> {
        let trader = sqlx::query_as::<_, TraderAccount>(
            r#"
            INSERT INTO trader_accounts (trader_id, is_active, is_admin, created_at, updated_at)
            VALUES ($1, true, $2, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(is_admin)
        .fetch_one(&mut **tx)
        .await?;

        if initial_cash_cents != 0 {
            LedgerRepository::initialize_cash(tx, trader.trader_id, initial_cash_cents).await?;
        }
        Ok(trader)
    }

    pub async fn get(pool: &sqlx::PgPool, trader_id: Uuid) -> Result<Option<TraderAccount>, RepositoryError> {
        let trader = sqlx::query_as::<_, TraderAccount>(
            "SELECT * FROM trader_accounts WHERE trader_id = $1",
        )
        .bind(trader_id)
        .fetch_optional(pool)
        .await?;
        Ok(trader)
    }

    pub async fn list_active(pool: &sqlx::PgPool) -> Result<Vec<TraderAccount>, RepositoryError> {
        let traders = sqlx::query_as::<_, TraderAccount>(
            "SELECT * FROM trader_accounts WHERE is_active ORDER BY created_at ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(traders)
    }

    /// Finds the single admin/treasury account, if one has been seeded
    /// (§3's "at most one row with admin = true" invariant).
    pub async fn get_treasury(pool: &sqlx::PgPool) -> Result<Option<TraderAccount>, RepositoryError> {
        let trader = sqlx::query_as::<_, TraderAccount>(
            "SELECT * FROM trader_accounts WHERE is_admin LIMIT 1",
        )
        .fetch_optional(pool)
        .await?;
        Ok(trader)
    }
}
