//! Outbox dispatcher
//!
//! Poller that drains unpublished outbox rows to the event bus and stamps
//! `published_at`. Rows are read oldest-first, so per-aggregate order
//! follows insertion order. A failed publish leaves the row unpublished
//! for the next poll (at-least-once).

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::errors::AppResult;
use crate::store::outbox;

use super::bus::EventBus;

pub struct OutboxDispatcher {
    pool: PgPool,
    bus: Arc<EventBus>,
    poll_interval: Duration,
    batch_size: i64,
}

impl OutboxDispatcher {
    pub fn new(pool: PgPool, bus: Arc<EventBus>, poll_interval: Duration, batch_size: i64) -> Self {
        Self {
            pool,
            bus,
            poll_interval,
            batch_size,
        }
    }

    /// Poll forever. Sweep errors are logged; the loop never exits.
    pub async fn run(&self) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "outbox dispatcher starting"
        );

        loop {
            match self.dispatch_once().await {
                Ok(published) if published > 0 => {
                    tracing::debug!(published, "outbox batch dispatched");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "outbox dispatch sweep failed");
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    /// One sweep: publish up to `batch_size` rows. Returns how many were
    /// stamped published. Public so tests can drive single sweeps.
    pub async fn dispatch_once(&self) -> AppResult<usize> {
        let rows = outbox::fetch_unpublished(&self.pool, self.batch_size).await?;
        let mut published = 0;

        for row in rows {
            match self.bus.publish(&row).await {
                Ok(()) => {
                    outbox::mark_published(&self.pool, row.id).await?;
                    published += 1;
                }
                Err(_) => {
                    // Keep this row and everything after it for the next
                    // poll; skipping ahead would reorder the aggregate.
                    break;
                }
            }
        }

        Ok(published)
    }
}
