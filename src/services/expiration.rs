//! Expiration Daemon (C7).
//!
//! Grounded on `engine/order_expiration_service.py`'s `_run_expiry_loop`:
//! a 1-second poll that looks up orders past their time-in-force and routes
//! a cancel for each. Per-order and per-iteration failures are logged and
//! swallowed so the loop itself never dies.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::models::CancelReason;
use crate::repositories::OrderRepository;
use crate::services::router::Router;

const BATCH_LIMIT: i64 = 100;

pub struct ExpirationDaemon {
    pool: PgPool,
    router: Arc<Router>,
    check_interval: Duration,
}

impl ExpirationDaemon {
    pub fn new(pool: PgPool, router: Arc<Router>, check_interval: Duration) -> Self {
        Self { pool, router, check_interval }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.check_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.check_and_expire_orders().await {
                tracing::error!(error = %e, "expiration daemon iteration failed");
            }
        }
    }

    async fn check_and_expire_orders(&self) -> Result<(), anyhow::Error> {
        let expired = OrderRepository::get_expired(&self.pool, BATCH_LIMIT).await?;
        if expired.is_empty() {
            return Ok(());
        }
        for order in expired {
            if let Err(e) = self
                .router
                .cancel(&order.symbol, order.order_id, CancelReason::Expired)
                .await
            {
                tracing::error!(order_id = %order.order_id, symbol = %order.symbol, error = %e, "failed to expire order");
            }
        }
        Ok(())
    }
}
