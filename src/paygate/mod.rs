//! Payment gateway port
//!
//! The purchasing core drives an external payment gateway (PG) through
//! this narrow port. Declines are data, not `Err`: the adapter reports the
//! gateway's answer (or its own timeout / open-breaker verdict) as a
//! [`PgCallResult`], and only transport-level surprises on the status
//! paths surface as errors.

pub mod card;
pub mod circuit_breaker;
pub mod http;
pub mod mock;
pub mod retry;
#[cfg(feature = "mock-pg")]
pub mod simulator;

use async_trait::async_trait;

use crate::errors::AppResult;

/// Error code the adapter reports while the breaker is open. Classified as
/// an external-system failure, so it never cancels an order.
pub const CIRCUIT_BREAKER_OPEN: &str = "CIRCUIT_BREAKER_OPEN";

/// Error code the adapter reports when the per-request deadline expires.
pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";

/// Outbound payment request.
#[derive(Debug, Clone)]
pub struct PgCommand {
    pub external_user_id: String,
    pub order_id: i64,
    pub card_type: String,
    pub card_no: String,
    pub amount: i64,
    pub callback_url: String,
}

/// Gateway answer to a payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgCallResult {
    Approved { transaction_key: String },
    Declined(PgFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgFailure {
    pub error_code: String,
    pub message: String,
    pub is_timeout: bool,
    pub is_retryable: bool,
}

impl PgFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            error_code: REQUEST_TIMEOUT.to_string(),
            message: message.into(),
            is_timeout: true,
            is_retryable: true,
        }
    }

    pub fn breaker_open() -> Self {
        Self {
            error_code: CIRCUIT_BREAKER_OPEN.to_string(),
            message: "circuit breaker is open".to_string(),
            is_timeout: false,
            is_retryable: true,
        }
    }
}

/// Payment status as the gateway ledger reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgPaymentStatus {
    Pending,
    Success,
    Failed,
    /// The ledger has no record of the order.
    NotFound,
}

impl PgPaymentStatus {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PgPaymentStatus::Pending),
            "SUCCESS" => Some(PgPaymentStatus::Success),
            "FAILED" => Some(PgPaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Detailed ledger record for one gateway transaction.
#[derive(Debug, Clone)]
pub struct PgTransaction {
    pub transaction_key: String,
    pub order_id: String,
    pub status: PgPaymentStatus,
    pub amount: i64,
    pub reason: Option<String>,
}

/// Outbound port to the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment. Never retried on this path; user-facing latency
    /// stays bounded by the adapter's single deadline.
    async fn request_payment(&self, cmd: &PgCommand) -> PgCallResult;

    /// Ledger lookup by (external user, padded order id).
    async fn status_by_order(
        &self,
        external_user_id: &str,
        padded_order_id: &str,
    ) -> AppResult<PgPaymentStatus>;

    /// Ledger lookup by transaction key.
    async fn status_by_transaction(
        &self,
        external_user_id: &str,
        transaction_key: &str,
    ) -> AppResult<PgTransaction>;
}

/// Order ids on the gateway wire are left-zero-padded to at least six
/// digits (downstream wire-format constraint).
pub fn pad_order_id(order_id: i64) -> String {
    format!("{order_id:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_order_id() {
        assert_eq!(pad_order_id(1), "000001");
        assert_eq!(pad_order_id(123456), "123456");
        assert_eq!(pad_order_id(1234567), "1234567");
    }

    #[test]
    fn test_status_from_wire() {
        assert_eq!(PgPaymentStatus::from_wire("SUCCESS"), Some(PgPaymentStatus::Success));
        assert_eq!(PgPaymentStatus::from_wire("FAILED"), Some(PgPaymentStatus::Failed));
        assert_eq!(PgPaymentStatus::from_wire("PENDING"), Some(PgPaymentStatus::Pending));
        assert_eq!(PgPaymentStatus::from_wire("SETTLED"), None);
    }

    #[test]
    fn test_failure_constructors() {
        let t = PgFailure::timeout("deadline exceeded");
        assert!(t.is_timeout);
        assert_eq!(t.error_code, REQUEST_TIMEOUT);

        let b = PgFailure::breaker_open();
        assert!(!b.is_timeout);
        assert_eq!(b.error_code, CIRCUIT_BREAKER_OPEN);
    }
}
