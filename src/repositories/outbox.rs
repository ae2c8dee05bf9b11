//! Outbox repository (C5/C8). Grounded on
//! `database/repositories_outbox.py`: events are queued in the same
//! transaction as the state they describe, and a separate, independently
//! committing `claim_batch` drains them with skip-locked semantics so
//! multiple publisher workers can run without contention.

use uuid::Uuid;

use crate::models::{BookStatePayload, MarketDataEventType, OutboxEvent, Trade, TradeEventPayload, TradePayload};

use super::error::RepositoryError;

pub struct OutboxRepository;

impl OutboxRepository {
    pub async fn queue_trade_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trade: &Trade,
        book: &BookStatePayload,
    ) -> Result<(), RepositoryError> {
        let payload = TradeEventPayload {
            trade: TradePayload {
                price: trade.price,
                quantity: trade.quantity,
                timestamp: trade.executed_at,
            },
            book: book.clone(),
        };
        let payload_json = serde_json::to_value(&payload).expect("trade event payload is always serializable");

        sqlx::query(
            r#"
            INSERT INTO outbox_events (event_id, event_type, symbol, payload, published, created_at)
            VALUES ($1, $2, $3, $4, false, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(MarketDataEventType::Trade)
        .bind(&trade.symbol)
        .bind(payload_json)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Claims up to `limit` unpublished rows ordered by creation time using
    /// a skip-locked read-for-update, so concurrent publisher workers never
    /// claim the same row. Returns the claimed events; the caller is
    /// responsible for publishing them and then calling `mark_published`
    /// within the same transaction before committing.
    pub async fn claim_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, RepositoryError> {
        let events = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT * FROM outbox_events
            WHERE NOT published
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;
        Ok(events)
    }

    pub async fn mark_published(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        if event_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE outbox_events SET published = true WHERE event_id = ANY($1)")
            .bind(event_ids)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
