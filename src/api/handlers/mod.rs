//! HTTP handlers

pub mod health;
pub mod orders;

pub use health::{HealthResponse, health_check};
pub use orders::{create_order, get_order, list_orders, payment_callback};
