//! Transactional outbox rows
//!
//! Appends happen inside the same transaction as the state change that
//! produced the event. The per-aggregate version is computed as
//! max(existing)+1 under that transaction, so (aggregate_type,
//! aggregate_id, version) is a contiguous sequence starting at 1.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use crate::domain::DomainEvent;
use crate::errors::AppResult;

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub id: i64,
    pub aggregate_type: String,
    pub aggregate_id: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub partition_key: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxRow {
    /// Deduplication identity for at-least-once consumers.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.aggregate_type, self.aggregate_id, self.version
        )
    }
}

fn row_to_outbox(row: &PgRow) -> OutboxRow {
    OutboxRow {
        id: row.get("id"),
        aggregate_type: row.get("aggregate_type"),
        aggregate_id: row.get("aggregate_id"),
        event_type: row.get("event_type"),
        payload: row.get("payload"),
        partition_key: row.get("partition_key"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        published_at: row.get("published_at"),
    }
}

/// Append one event, choosing version = max(existing)+1 for its aggregate.
pub async fn append(conn: &mut PgConnection, event: &DomainEvent) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO outbox_events
            (aggregate_type, aggregate_id, event_type, payload, partition_key, version)
        VALUES ($1, $2, $3, $4, $5,
            (SELECT COALESCE(MAX(version), 0) + 1
             FROM outbox_events
             WHERE aggregate_type = $1 AND aggregate_id = $2))
        RETURNING id
        "#,
    )
    .bind(event.aggregate_type())
    .bind(event.aggregate_id())
    .bind(event.event_type())
    .bind(event.payload())
    .bind(event.partition_key())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Unpublished rows, oldest first (insertion order doubles as the
/// per-aggregate publication order).
pub async fn fetch_unpublished(pool: &PgPool, limit: i64) -> AppResult<Vec<OutboxRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, aggregate_type, aggregate_id, event_type, payload,
               partition_key, version, created_at, published_at
        FROM outbox_events
        WHERE published_at IS NULL
        ORDER BY id ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_outbox).collect())
}

pub async fn mark_published(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE outbox_events SET published_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All versions recorded for one aggregate, ascending (test support).
pub async fn versions_for(
    pool: &PgPool,
    aggregate_type: &str,
    aggregate_id: i64,
) -> AppResult<Vec<i64>> {
    let versions = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT version FROM outbox_events
        WHERE aggregate_type = $1 AND aggregate_id = $2
        ORDER BY version ASC
        "#,
    )
    .bind(aggregate_type)
    .bind(aggregate_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key() {
        let row = OutboxRow {
            id: 1,
            aggregate_type: "PAYMENT".to_string(),
            aggregate_id: 42,
            event_type: "PaymentCompleted".to_string(),
            payload: serde_json::json!({}),
            partition_key: "PAYMENT-42".to_string(),
            version: 3,
            created_at: Utc::now(),
            published_at: None,
        };
        assert_eq!(row.dedup_key(), "PAYMENT:42:3");
    }
}
