//! In-process event bus
//!
//! The downstream "broker" for this deployment shape: a registry of
//! handlers invoked per outbox row. Publication is at-least-once; a
//! handler error fails the publish so the dispatcher leaves the row
//! unpublished and retries it on the next poll.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::store::OutboxRow;

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle one event. Must be idempotent: the same row may arrive
    /// more than once.
    async fn handle(&self, row: &OutboxRow) -> AppResult<()>;
}

#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        tracing::info!(handler = handler.name(), "event handler registered");
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver one row to every handler. The first handler error aborts
    /// the publish; already-notified handlers will see the row again and
    /// must swallow the duplicate.
    pub async fn publish(&self, row: &OutboxRow) -> AppResult<()> {
        for handler in &self.handlers {
            handler.handle(row).await.map_err(|err| {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %row.event_type,
                    dedup_key = %row.dedup_key(),
                    error = %err,
                    "event handler failed; row stays unpublished"
                );
                err
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(event_type: &str) -> OutboxRow {
        OutboxRow {
            id: 1,
            aggregate_type: "ORDER".to_string(),
            aggregate_id: 1,
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
            partition_key: "ORDER-1".to_string(),
            version: 1,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, _row: &OutboxRow) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::internal("boom"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_handlers() {
        let mut bus = EventBus::new();
        let a = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        let b = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        bus.register(a.clone());
        bus.register(b.clone());

        bus.publish(&row("OrderCreated")).await.unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_fails_the_publish() {
        let mut bus = EventBus::new();
        bus.register(Arc::new(Counting { calls: AtomicUsize::new(0), fail: true }));

        assert!(bus.publish(&row("OrderCreated")).await.is_err());
    }
}
