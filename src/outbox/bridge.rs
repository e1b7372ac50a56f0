//! Outbox bridge
//!
//! Runs inside the writer's transaction and turns in-process domain
//! events into outbox rows. Staging errors are logged and swallowed: a
//! transient outbox problem must never take the primary state change down
//! with it. The loss window is covered by the reconciliation sweep, which
//! re-derives payment state from the gateway ledger.

use sqlx::PgConnection;

use crate::domain::DomainEvent;
use crate::store::outbox;

/// Stage `events` on the caller's transaction.
pub async fn stage_events(conn: &mut PgConnection, events: &[DomainEvent]) {
    for event in events {
        match outbox::append(conn, event).await {
            Ok(id) => {
                tracing::debug!(
                    outbox_id = id,
                    event_type = event.event_type(),
                    aggregate = %event.partition_key(),
                    "event staged"
                );
            }
            Err(err) => {
                tracing::error!(
                    event_type = event.event_type(),
                    aggregate = %event.partition_key(),
                    error = %err,
                    "failed to stage outbox event; continuing without it"
                );
            }
        }
    }
}
