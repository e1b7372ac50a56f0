//! Transactional outbox and event dispatch
//!
//! Writers stage domain events into the outbox inside their own
//! transaction (bridge); a poller publishes unpublished rows to the
//! in-process bus at-least-once (dispatcher); consumers are idempotent
//! keyed by the outbox row identity or natural payload keys (handlers).

pub mod bridge;
pub mod bus;
pub mod dispatcher;
pub mod handlers;

pub use bus::{EventBus, EventHandler};
pub use dispatcher::OutboxDispatcher;
