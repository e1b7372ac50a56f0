//! Orderflow - E-commerce Purchasing Core
//!
//! Entry point: wire config, database, gateway adapter, orchestrator,
//! outbox dispatcher and reconciliation worker, then serve HTTP.
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │  HTTP   │──▶│ Orchestr.  │──▶│  PostgreSQL  │──▶│  Outbox    │
//! │ (axum)  │   │ (T1 + hooks)│  │ (row locks)  │   │ dispatcher │
//! └─────────┘   └─────┬──────┘   └──────────────┘   └────────────┘
//!                     │ post-commit                       ▲
//!                     ▼                                   │
//!               ┌────────────┐   ┌──────────────┐         │
//!               │  Gateway   │◀──│ Reconcile    │─────────┘
//!               │  adapter   │   │ worker       │
//!               └────────────┘   └──────────────┘
//! ```

use std::sync::Arc;

use orderflow::api::{self, state::AppState};
use orderflow::config::AppConfig;
use orderflow::db::Database;
use orderflow::logging::init_logging;
use orderflow::orders::OrderService;
use orderflow::outbox::handlers::{
    CompletionLogHandler, PaymentMetricsHandler, RankingSignalHandler,
};
use orderflow::outbox::{EventBus, OutboxDispatcher};
use orderflow::paygate::circuit_breaker::{BreakerConfig, CircuitBreaker};
use orderflow::paygate::http::HttpPaymentGateway;
use orderflow::paygate::retry::RetryPolicy;
use orderflow::reconcile::{ReconcileWorker, SnapshotCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("ORDERFLOW_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = AppConfig::load(&config_path)?;

    let _log_guard = init_logging(&config.logging);
    tracing::info!("starting orderflow");

    // Database (schema bootstrap folded into open when configured)
    let database = Arc::new(Database::open(&config.database).await?);

    // Payment gateway adapter
    let breaker = Arc::new(CircuitBreaker::new(BreakerConfig {
        failure_threshold: config.gateway.breaker_failure_threshold,
        open_for: std::time::Duration::from_millis(config.gateway.breaker_open_for_ms),
        success_threshold: config.gateway.breaker_success_threshold,
    }));
    let gateway = Arc::new(HttpPaymentGateway::new(
        config.gateway.base_url.clone(),
        config.gateway.request_timeout(),
        breaker,
    )?);

    // Orchestrator
    let status_retry = RetryPolicy {
        max_retries: config.gateway.status_retry_max,
        initial_delay: std::time::Duration::from_millis(
            config.gateway.status_retry_initial_delay_ms,
        ),
        ..RetryPolicy::default()
    };
    let orders = Arc::new(OrderService::new(
        database.clone(),
        gateway,
        config.gateway.callback_base_url.clone(),
        config.gateway.recovery_delay(),
        status_retry,
    ));

    // Outbox dispatch
    let snapshots = Arc::new(SnapshotCache::new(config.reconcile.snapshot_retention_days));
    let mut bus = EventBus::new();
    bus.register(Arc::new(PaymentMetricsHandler::new()));
    bus.register(Arc::new(RankingSignalHandler::new(snapshots)));
    bus.register(Arc::new(CompletionLogHandler::new()));
    let dispatcher = OutboxDispatcher::new(
        database.pool().clone(),
        Arc::new(bus),
        std::time::Duration::from_millis(config.outbox.poll_interval_ms),
        config.outbox.batch_size,
    );
    tokio::spawn(async move { dispatcher.run().await });

    // Reconciliation sweep
    let reconciler = ReconcileWorker::new(
        database.pool().clone(),
        orders.clone(),
        std::time::Duration::from_millis(config.reconcile.sweep_interval_ms),
        std::time::Duration::from_secs(config.reconcile.stale_after_secs),
        config.reconcile.batch_size,
    );
    tokio::spawn(async move { reconciler.run().await });

    // HTTP surface
    let state = Arc::new(AppState::new(database, orders));
    api::run_server(state, &config.server.addr()).await
}
