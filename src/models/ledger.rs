use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const CASH_ACCOUNT: &str = "CASH";

/// Shares accounts are namespaced by symbol, e.g. `SHARES:@elonmusk`.
pub fn shares_account(symbol: &str) -> String {
    format!("SHARES:{symbol}")
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub trade_id: Option<Uuid>,
    pub trader_id: Uuid,
    pub account: String,
    pub debit_amount: i64,
    pub credit_amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
