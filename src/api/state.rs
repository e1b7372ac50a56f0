//! Shared application state for the HTTP layer

use std::sync::Arc;

use crate::db::Database;
use crate::orders::OrderService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn new(db: Arc<Database>, orders: Arc<OrderService>) -> Self {
        Self { db, orders }
    }
}
