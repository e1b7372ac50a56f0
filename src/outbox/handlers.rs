//! Downstream event handlers
//!
//! At-least-once consumers of the outbox stream. Each keeps its own dedup
//! set: the metrics handler keys on the payment natural key, the others on
//! the outbox row identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;

use crate::errors::AppResult;
use crate::reconcile::snapshot::SnapshotCache;
use crate::store::OutboxRow;

use super::bus::EventHandler;

/// Counters over terminal payment events, deduplicated on
/// (paymentId, terminal status) so replays cannot double-count.
#[derive(Default)]
pub struct PaymentMetricsHandler {
    seen: DashSet<String>,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl PaymentMetricsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for PaymentMetricsHandler {
    fn name(&self) -> &'static str {
        "payment-metrics"
    }

    async fn handle(&self, row: &OutboxRow) -> AppResult<()> {
        let counter = match row.event_type.as_str() {
            "PaymentCompleted" => &self.completed,
            "PaymentFailed" => &self.failed,
            _ => return Ok(()),
        };

        let payment_id = row.payload["paymentId"].as_i64().unwrap_or(row.aggregate_id);
        let natural_key = format!("{}:{}", payment_id, row.event_type);
        if self.seen.insert(natural_key) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Daily purchase counts for the ranking feed, written into the snapshot
/// cache so ranking reads have a fallback page when the feed is down.
pub struct RankingSignalHandler {
    seen: DashSet<String>,
    snapshots: Arc<SnapshotCache<u64>>,
}

impl RankingSignalHandler {
    pub fn new(snapshots: Arc<SnapshotCache<u64>>) -> Self {
        Self {
            seen: DashSet::new(),
            snapshots,
        }
    }
}

#[async_trait]
impl EventHandler for RankingSignalHandler {
    fn name(&self) -> &'static str {
        "ranking-signal"
    }

    async fn handle(&self, row: &OutboxRow) -> AppResult<()> {
        if row.event_type != "OrderCompleted" {
            return Ok(());
        }
        if !self.seen.insert(row.dedup_key()) {
            return Ok(());
        }

        let today = row.created_at.date_naive();
        let count = self.snapshots.get(today).unwrap_or(0);
        self.snapshots.put(today, count + 1);
        Ok(())
    }
}

/// Terminal-state audit log (stand-in for the notification fan-out).
#[derive(Default)]
pub struct CompletionLogHandler {
    seen: DashSet<String>,
}

impl CompletionLogHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventHandler for CompletionLogHandler {
    fn name(&self) -> &'static str {
        "completion-log"
    }

    async fn handle(&self, row: &OutboxRow) -> AppResult<()> {
        if !matches!(row.event_type.as_str(), "OrderCompleted" | "OrderCanceled") {
            return Ok(());
        }
        if !self.seen.insert(row.dedup_key()) {
            return Ok(());
        }

        tracing::info!(
            event_type = %row.event_type,
            aggregate = %row.partition_key,
            payload = %row.payload,
            "order reached terminal state"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: i64, event_type: &str, version: i64, payload: serde_json::Value) -> OutboxRow {
        OutboxRow {
            id,
            aggregate_type: "PAYMENT".to_string(),
            aggregate_id: id,
            event_type: event_type.to_string(),
            payload,
            partition_key: format!("PAYMENT-{id}"),
            version,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_metrics_dedup_on_natural_key() {
        let handler = PaymentMetricsHandler::new();
        let completed = row(7, "PaymentCompleted", 2, serde_json::json!({"paymentId": 7}));

        handler.handle(&completed).await.unwrap();
        // Redelivery of the same payment's completion must not double-count.
        handler.handle(&completed).await.unwrap();
        assert_eq!(handler.completed_count(), 1);

        let failed = row(8, "PaymentFailed", 2, serde_json::json!({"paymentId": 8}));
        handler.handle(&failed).await.unwrap();
        assert_eq!(handler.failed_count(), 1);
        assert_eq!(handler.completed_count(), 1);
    }

    #[tokio::test]
    async fn test_metrics_ignore_unrelated_events() {
        let handler = PaymentMetricsHandler::new();
        handler
            .handle(&row(1, "OrderCreated", 1, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(handler.completed_count(), 0);
        assert_eq!(handler.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_ranking_signal_accumulates_per_day() {
        let cache = Arc::new(SnapshotCache::new(7));
        let handler = RankingSignalHandler::new(cache.clone());

        let first = row(1, "OrderCompleted", 1, serde_json::json!({"orderId": 1}));
        let second = row(2, "OrderCompleted", 1, serde_json::json!({"orderId": 2}));
        handler.handle(&first).await.unwrap();
        handler.handle(&first).await.unwrap(); // replay
        handler.handle(&second).await.unwrap();

        let today = first.created_at.date_naive();
        assert_eq!(cache.get(today), Some(2));
    }
}
