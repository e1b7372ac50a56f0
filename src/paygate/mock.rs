//! Scripted mock gateway for unit and integration tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    PaymentGateway, PgCallResult, PgCommand, PgFailure, PgPaymentStatus, PgTransaction,
};
use crate::errors::{AppError, AppResult};

/// Mock implementation of the gateway port.
///
/// Payment-request outcomes are scripted with [`enqueue_result`]; once the
/// script is exhausted every request is approved. The ledger side is a
/// plain map keyed by padded order id, settable from tests.
pub struct MockPaymentGateway {
    scripted: Mutex<VecDeque<PgCallResult>>,
    ledger: DashMap<String, PgTransaction>,
    request_count: AtomicUsize,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            ledger: DashMap::new(),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn enqueue_result(&self, result: PgCallResult) {
        self.scripted.lock().unwrap().push_back(result);
    }

    pub fn enqueue_decline(&self, error_code: &str) {
        self.enqueue_result(PgCallResult::Declined(PgFailure {
            error_code: error_code.to_string(),
            message: format!("scripted decline: {error_code}"),
            is_timeout: false,
            is_retryable: false,
        }));
    }

    pub fn enqueue_timeout(&self) {
        self.enqueue_result(PgCallResult::Declined(PgFailure::timeout(
            "scripted timeout",
        )));
    }

    /// Seed the ledger for a padded order id.
    pub fn set_ledger_status(&self, padded_order_id: &str, status: PgPaymentStatus) {
        self.ledger.insert(
            padded_order_id.to_string(),
            PgTransaction {
                transaction_key: format!("mock-tx-{padded_order_id}"),
                order_id: padded_order_id.to_string(),
                status,
                amount: 0,
                reason: None,
            },
        );
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn request_payment(&self, cmd: &PgCommand) -> PgCallResult {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let scripted = self.scripted.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| PgCallResult::Approved {
            transaction_key: format!("mock-tx-{}", super::pad_order_id(cmd.order_id)),
        });

        // Approvals land in the ledger like a real gateway's would.
        if let PgCallResult::Approved { transaction_key } = &result {
            self.ledger.insert(
                super::pad_order_id(cmd.order_id),
                PgTransaction {
                    transaction_key: transaction_key.clone(),
                    order_id: super::pad_order_id(cmd.order_id),
                    status: PgPaymentStatus::Success,
                    amount: cmd.amount,
                    reason: None,
                },
            );
        }

        result
    }

    async fn status_by_order(
        &self,
        _external_user_id: &str,
        padded_order_id: &str,
    ) -> AppResult<PgPaymentStatus> {
        Ok(self
            .ledger
            .get(padded_order_id)
            .map(|entry| entry.status)
            .unwrap_or(PgPaymentStatus::NotFound))
    }

    async fn status_by_transaction(
        &self,
        _external_user_id: &str,
        transaction_key: &str,
    ) -> AppResult<PgTransaction> {
        self.ledger
            .iter()
            .find(|entry| entry.transaction_key == transaction_key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("transaction not found: {transaction_key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(order_id: i64) -> PgCommand {
        PgCommand {
            external_user_id: "u-1".to_string(),
            order_id,
            card_type: "SAMSUNG".to_string(),
            card_no: "4111111111111111".to_string(),
            amount: 10_000,
            callback_url: "http://localhost/cb".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_then_default_approve() {
        let gw = MockPaymentGateway::new();
        gw.enqueue_decline("LIMIT_EXCEEDED");

        match gw.request_payment(&command(1)).await {
            PgCallResult::Declined(f) => assert_eq!(f.error_code, "LIMIT_EXCEEDED"),
            other => panic!("expected decline, got {other:?}"),
        }
        assert!(matches!(
            gw.request_payment(&command(2)).await,
            PgCallResult::Approved { .. }
        ));
        assert_eq!(gw.request_count(), 2);
    }

    #[tokio::test]
    async fn test_approval_lands_in_ledger() {
        let gw = MockPaymentGateway::new();
        gw.request_payment(&command(3)).await;

        let status = gw.status_by_order("u-1", "000003").await.unwrap();
        assert_eq!(status, PgPaymentStatus::Success);
        assert_eq!(
            gw.status_by_order("u-1", "000099").await.unwrap(),
            PgPaymentStatus::NotFound
        );
    }
}
