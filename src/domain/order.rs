//! Order aggregate
//!
//! An order owns its item snapshots (value objects captured from the locked
//! product rows at creation time). Terminal states are absorbing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELED" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price/name snapshot of one ordered product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    /// Unit price at order time.
    pub price: i64,
    pub quantity: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub items: Vec<OrderItem>,
    pub coupon_code: Option<String>,
    pub discount_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Validate the arithmetic invariant for a new order and return the
    /// total: `Σ(price·qty) − discount ≥ 0` with a non-empty item list.
    pub fn checked_total(items: &[OrderItem], discount_amount: i64) -> AppResult<i64> {
        if items.is_empty() {
            return Err(AppError::bad_request("order must contain at least one item"));
        }
        if discount_amount < 0 {
            return Err(AppError::bad_request("discount must not be negative"));
        }
        let subtotal: i64 = items.iter().map(OrderItem::line_total).sum();
        let total = subtotal - discount_amount;
        if total < 0 {
            return Err(AppError::bad_request(
                "discount exceeds order subtotal",
            ));
        }
        Ok(total)
    }

    /// Whether a transition from the current status to `next` is legal.
    /// Orders only ever advance out of PENDING.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.status == OrderStatus::Pending && next.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, qty: i64) -> OrderItem {
        OrderItem {
            product_id: 1,
            name: "Keyboard".to_string(),
            price,
            quantity: qty,
        }
    }

    #[test]
    fn test_checked_total() {
        let items = vec![item(10_000, 2), item(5_000, 1)];
        assert_eq!(Order::checked_total(&items, 2_500).unwrap(), 22_500);
    }

    #[test]
    fn test_empty_items_rejected() {
        assert!(Order::checked_total(&[], 0).is_err());
    }

    #[test]
    fn test_discount_beyond_subtotal_rejected() {
        let items = vec![item(1_000, 1)];
        assert!(Order::checked_total(&items, 1_001).is_err());
        assert_eq!(Order::checked_total(&items, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_terminal_states_absorbing() {
        let mut order = Order {
            id: 1,
            user_id: 1,
            status: OrderStatus::Completed,
            total_amount: 1_000,
            items: vec![item(1_000, 1)],
            coupon_code: None,
            discount_amount: 0,
            created_at: Utc::now(),
        };
        assert!(!order.can_transition_to(OrderStatus::Canceled));
        order.status = OrderStatus::Pending;
        assert!(order.can_transition_to(OrderStatus::Canceled));
        assert!(order.can_transition_to(OrderStatus::Completed));
        assert!(!order.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Canceled] {
            assert_eq!(OrderStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::from_str("SHIPPED"), None);
    }
}
