//! Orderflow - E-commerce Purchasing Core
//!
//! Order intake, row-locked stock/point reservation, optimistic coupon
//! redemption, a gateway-driven payment lifecycle, a transactional outbox
//! with in-process dispatch, and a reconciliation loop that settles
//! uncertain payments against the gateway ledger.
//!
//! # Modules
//!
//! - [`domain`] - Entities, value objects and domain events
//! - [`errors`] - `AppError` taxonomy shared by all layers
//! - [`db`] - Connection pool and schema bootstrap
//! - [`store`] - Repositories (runtime queries, CAS updates, row locks)
//! - [`reservation`] - Lock-ordered stock/point holds
//! - [`redemption`] - Single-use coupon redemption
//! - [`paygate`] - Payment gateway port, HTTP adapter, resilience policies
//! - [`orders`] - Order orchestration (create, cancel, callback, recovery)
//! - [`outbox`] - Event bridge, poller dispatcher, idempotent handlers
//! - [`reconcile`] - Stale-PENDING sweep and snapshot fallback cache
//! - [`api`] - HTTP surface (axum)
//! - [`config`] / [`logging`] - Runtime wiring

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod orders;
pub mod outbox;
pub mod paygate;
pub mod reconcile;
pub mod redemption;
pub mod reservation;
pub mod store;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use domain::{Order, OrderItem, OrderStatus, Payment, PaymentStatus};
pub use errors::{AppError, AppResult};
pub use orders::{CreateOrderCommand, OrderService};
pub use paygate::PaymentGateway;
