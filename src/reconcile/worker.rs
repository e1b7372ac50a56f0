//! Reconciliation worker
//!
//! Scans payments stuck in PENDING past a staleness threshold and drives
//! them to a terminal state using the gateway ledger as the source of
//! truth. Goes through the same idempotent entry points the online path
//! uses, so racing a late callback is harmless.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::errors::AppResult;
use crate::orders::OrderService;
use crate::store::payments;

pub struct ReconcileWorker {
    pool: PgPool,
    service: Arc<OrderService>,
    sweep_interval: Duration,
    stale_after: Duration,
    batch_size: i64,
}

impl ReconcileWorker {
    pub fn new(
        pool: PgPool,
        service: Arc<OrderService>,
        sweep_interval: Duration,
        stale_after: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            service,
            sweep_interval,
            stale_after,
            batch_size,
        }
    }

    /// Sweep forever. Individual payment failures are logged and skipped;
    /// the loop never exits.
    pub async fn run(&self) {
        tracing::info!(
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            stale_after_secs = self.stale_after.as_secs(),
            "reconciliation worker starting"
        );

        loop {
            match self.sweep_once().await {
                Ok(resolved) if resolved > 0 => {
                    tracing::info!(resolved, "reconciliation sweep settled payments");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "reconciliation sweep failed");
                }
            }
            sleep(self.sweep_interval).await;
        }
    }

    /// One sweep over the stale PENDING set. Returns how many payments
    /// reached a terminal state. Public so tests can drive single sweeps.
    pub async fn sweep_once(&self) -> AppResult<usize> {
        let stale = payments::find_stale_pending(&self.pool, self.stale_after, self.batch_size)
            .await?;
        if stale.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = stale.len(), "stale PENDING payments found");

        let mut resolved = 0;
        for payment in stale {
            match self.service.recover_after_timeout(payment.order_id).await {
                Ok(()) => {
                    // Count only payments that actually left PENDING.
                    match payments::find_by_order_id(&self.pool, payment.order_id).await {
                        Ok(current) if current.status.is_terminal() => resolved += 1,
                        _ => {}
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        order_id = payment.order_id,
                        payment_id = payment.id,
                        error = %err,
                        "failed to reconcile payment; will retry next sweep"
                    );
                }
            }
        }

        Ok(resolved)
    }
}
