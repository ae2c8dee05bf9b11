//! Ledger repository (C5/C6). Grounded on
//! `database/repositories_ledger.py::post_trade_entries_without_commit`:
//! every trade posts four append-only rows. Balances are always derived as
//! Σdebits − Σcredits, with debit meaning "increases the account" and
//! credit "decreases the account" for both the cash and shares accounts
//! (see DESIGN.md's open-question resolution on cash polarity): buyer cash
//! credit, seller cash debit, buyer shares debit, seller shares credit.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::{shares_account, Trade, CASH_ACCOUNT};

use super::error::RepositoryError;

pub struct LedgerRepository;

impl LedgerRepository {
    pub async fn post_trade(
        tx: &mut Transaction<'_, Postgres>,
        trade: &Trade,
    ) -> Result<(), RepositoryError> {
        let notional = trade.price * trade.quantity;
        let shares_acct = shares_account(&trade.symbol);

        Self::insert(
            tx,
            Some(trade.trade_id),
            trade.buyer_id,
            CASH_ACCOUNT,
            0,
            notional,
            &format!(
                "Buy {} {} @ ${:.2}",
                trade.quantity,
                trade.symbol,
                trade.price as f64 / 100.0
            ),
        )
        .await?;
        Self::insert(
            tx,
            Some(trade.trade_id),
            trade.seller_id,
            CASH_ACCOUNT,
            notional,
            0,
            &format!(
                "Sell {} {} @ ${:.2}",
                trade.quantity,
                trade.symbol,
                trade.price as f64 / 100.0
            ),
        )
        .await?;
        Self::insert(
            tx,
            Some(trade.trade_id),
            trade.buyer_id,
            &shares_acct,
            trade.quantity,
            0,
            &format!("Receive {} shares", trade.quantity),
        )
        .await?;
        Self::insert(
            tx,
            Some(trade.trade_id),
            trade.seller_id,
            &shares_acct,
            0,
            trade.quantity,
            &format!("Deliver {} shares", trade.quantity),
        )
        .await?;
        Ok(())
    }

    /// Posts a single funding debit on the cash account, used when a trader
    /// is provisioned (ordinary or treasury) with starting capital.
    pub async fn initialize_cash(
        tx: &mut Transaction<'_, Postgres>,
        trader_id: Uuid,
        amount: i64,
    ) -> Result<(), RepositoryError> {
        Self::insert(
            tx,
            None,
            trader_id,
            CASH_ACCOUNT,
            amount,
            0,
            "Initial funding",
        )
        .await
    }

    /// Posts a single funding debit on a symbol's shares account, used when
    /// seeding a treasury's initial share supply.
    pub async fn initialize_shares(
        tx: &mut Transaction<'_, Postgres>,
        trader_id: Uuid,
        symbol: &str,
        quantity: i64,
    ) -> Result<(), RepositoryError> {
        Self::insert(
            tx,
            None,
            trader_id,
            &shares_account(symbol),
            quantity,
            0,
            "Initial share issuance",
        )
        .await
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        trade_id: Option<Uuid>,
        trader_id: Uuid,
        account: &str,
        debit_amount: i64,
        credit_amount: i64,
        description: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, trade_id, trader_id, account, debit_amount, credit_amount, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trade_id)
        .bind(trader_id)
        .bind(account)
        .bind(debit_amount)
        .bind(credit_amount)
        .bind(description)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn cash_balance(pool: &sqlx::PgPool, trader_id: Uuid) -> Result<i64, RepositoryError> {
        Self::balance(pool, trader_id, CASH_ACCOUNT).await
    }

    pub async fn share_balance(
        pool: &sqlx::PgPool,
        trader_id: Uuid,
        symbol: &str,
    ) -> Result<i64, RepositoryError> {
        Self::balance(pool, trader_id, &shares_account(symbol)).await
    }

    async fn balance(pool: &sqlx::PgPool, trader_id: Uuid, account: &str) -> Result<i64, RepositoryError> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(debit_amount), 0) - COALESCE(SUM(credit_amount), 0)
            FROM ledger_entries
            WHERE trader_id = $1 AND account = $2
            "#,
        )
        .bind(trader_id)
        .bind(account)
        .fetch_one(pool)
        .await?;
        Ok(balance.unwrap_or(0))
    }
}
