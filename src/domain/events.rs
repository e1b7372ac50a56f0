//! Domain events
//!
//! Produced by the writer components inside their transactions and bridged
//! into the outbox table. Consumers deduplicate on the outbox identity
//! (aggregate_type, aggregate_id, version) or on the natural keys carried
//! in the payload.

use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    OrderCreated {
        order_id: i64,
        user_id: i64,
        total_amount: i64,
    },
    OrderCompleted {
        order_id: i64,
        user_id: i64,
    },
    OrderCanceled {
        order_id: i64,
        user_id: i64,
        reason: String,
    },
    PaymentCreated {
        payment_id: i64,
        order_id: i64,
        paid_amount: i64,
    },
    PaymentCompleted {
        payment_id: i64,
        order_id: i64,
        transaction_key: Option<String>,
    },
    PaymentFailed {
        payment_id: i64,
        order_id: i64,
        reason: String,
    },
}

impl DomainEvent {
    pub fn aggregate_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. }
            | DomainEvent::OrderCompleted { .. }
            | DomainEvent::OrderCanceled { .. } => "ORDER",
            DomainEvent::PaymentCreated { .. }
            | DomainEvent::PaymentCompleted { .. }
            | DomainEvent::PaymentFailed { .. } => "PAYMENT",
        }
    }

    pub fn aggregate_id(&self) -> i64 {
        match self {
            DomainEvent::OrderCreated { order_id, .. }
            | DomainEvent::OrderCompleted { order_id, .. }
            | DomainEvent::OrderCanceled { order_id, .. } => *order_id,
            DomainEvent::PaymentCreated { payment_id, .. }
            | DomainEvent::PaymentCompleted { payment_id, .. }
            | DomainEvent::PaymentFailed { payment_id, .. } => *payment_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "OrderCreated",
            DomainEvent::OrderCompleted { .. } => "OrderCompleted",
            DomainEvent::OrderCanceled { .. } => "OrderCanceled",
            DomainEvent::PaymentCreated { .. } => "PaymentCreated",
            DomainEvent::PaymentCompleted { .. } => "PaymentCompleted",
            DomainEvent::PaymentFailed { .. } => "PaymentFailed",
        }
    }

    /// Downstream ordering key; the aggregate id keeps one aggregate's
    /// events on one partition.
    pub fn partition_key(&self) -> String {
        format!("{}-{}", self.aggregate_type(), self.aggregate_id())
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            DomainEvent::OrderCreated {
                order_id,
                user_id,
                total_amount,
            } => json!({
                "orderId": order_id,
                "userId": user_id,
                "totalAmount": total_amount,
            }),
            DomainEvent::OrderCompleted { order_id, user_id } => json!({
                "orderId": order_id,
                "userId": user_id,
                "status": "COMPLETED",
            }),
            DomainEvent::OrderCanceled {
                order_id,
                user_id,
                reason,
            } => json!({
                "orderId": order_id,
                "userId": user_id,
                "status": "CANCELED",
                "reason": reason,
            }),
            DomainEvent::PaymentCreated {
                payment_id,
                order_id,
                paid_amount,
            } => json!({
                "paymentId": payment_id,
                "orderId": order_id,
                "paidAmount": paid_amount,
            }),
            DomainEvent::PaymentCompleted {
                payment_id,
                order_id,
                transaction_key,
            } => json!({
                "paymentId": payment_id,
                "orderId": order_id,
                "status": "SUCCESS",
                "transactionKey": transaction_key,
            }),
            DomainEvent::PaymentFailed {
                payment_id,
                order_id,
                reason,
            } => json!({
                "paymentId": payment_id,
                "orderId": order_id,
                "status": "FAILED",
                "reason": reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_identity() {
        let evt = DomainEvent::PaymentCompleted {
            payment_id: 42,
            order_id: 7,
            transaction_key: Some("tx-abc".to_string()),
        };
        assert_eq!(evt.aggregate_type(), "PAYMENT");
        assert_eq!(evt.aggregate_id(), 42);
        assert_eq!(evt.event_type(), "PaymentCompleted");
        assert_eq!(evt.partition_key(), "PAYMENT-42");
    }

    #[test]
    fn test_payload_carries_natural_keys() {
        let evt = DomainEvent::OrderCanceled {
            order_id: 9,
            user_id: 3,
            reason: "LIMIT_EXCEEDED".to_string(),
        };
        let payload = evt.payload();
        assert_eq!(payload["orderId"], 9);
        assert_eq!(payload["status"], "CANCELED");
        assert_eq!(payload["reason"], "LIMIT_EXCEEDED");
    }
}
