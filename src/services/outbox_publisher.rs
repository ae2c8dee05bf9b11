//! Outbox Publisher (C8).
//!
//! Grounded on `services/market_data_publisher.py`'s `_run_publisher_loop`:
//! adaptive batching that drains hard while busy and backs off
//! progressively while idle. Each iteration claims a batch with
//! skip-locked semantics, publishes every claimed event on Redis, flips
//! `published` for the whole claimed set, and commits — all in one
//! transaction, matching the Python's `publish_batch_with_commit`.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::cache::Publisher;
use crate::repositories::OutboxRepository;

const PARTIAL_BACKOFF: Duration = Duration::from_millis(10);
const EMPTY_BACKOFF: Duration = Duration::from_millis(100);
const EMPTY_BACKOFFS_BEFORE_MAX: u32 = 10;

pub struct OutboxPublisher {
    pool: PgPool,
    publisher: Arc<Publisher>,
    batch_size: i64,
    max_backoff: Duration,
}

impl OutboxPublisher {
    pub fn new(pool: PgPool, publisher: Arc<Publisher>, batch_size: i64, max_backoff: Duration) -> Self {
        Self { pool, publisher, batch_size, max_backoff }
    }

    pub async fn run(self) {
        let mut consecutive_empty: u32 = 0;
        loop {
            match self.publish_batch().await {
                Ok(published) if published >= self.batch_size => {
                    consecutive_empty = 0;
                }
                Ok(published) if published > 0 => {
                    consecutive_empty = 0;
                    tokio::time::sleep(PARTIAL_BACKOFF).await;
                }
                Ok(_) => {
                    consecutive_empty += 1;
                    if consecutive_empty < EMPTY_BACKOFFS_BEFORE_MAX {
                        tokio::time::sleep(EMPTY_BACKOFF).await;
                    } else {
                        tokio::time::sleep(self.max_backoff).await;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "outbox publisher iteration failed");
                    tokio::time::sleep(self.max_backoff).await;
                }
            }
        }
    }

    async fn publish_batch(&self) -> Result<i64, anyhow::Error> {
        let mut tx = self.pool.begin().await?;
        let events = OutboxRepository::claim_batch(&mut tx, self.batch_size).await?;
        if events.is_empty() {
            tx.rollback().await?;
            return Ok(0);
        }

        for event in &events {
            let channel = event.channel();
            if let Err(e) = self.publisher.publish(&channel, &event.payload.to_string()).await {
                tracing::error!(event_id = %event.event_id, channel = %channel, error = %e, "failed to publish outbox event, leaving batch unpublished for retry");
                tx.rollback().await?;
                return Err(e.into());
            }
        }

        let event_ids: Vec<uuid::Uuid> = events.iter().map(|e| e.event_id).collect();
        OutboxRepository::mark_published(&mut tx, &event_ids).await?;
        tx.commit().await?;
        Ok(events.len() as i64)
    }
}
