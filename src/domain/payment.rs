//! Payment lifecycle state machine
//!
//! One payment per order. PENDING is the only non-terminal state; terminal
//! transitions are idempotent (re-applying the same terminal is a no-op)
//! and cross-terminal transitions are rejected outright.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of applying a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The state actually changed; emit the matching event.
    Transitioned,
    /// Same terminal re-applied; return normally, emit nothing.
    AlreadyTerminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub total_amount: i64,
    /// Point actually spent on this payment. Refunds use this, never the total.
    pub used_point: i64,
    /// total_amount − used_point; zero means no gateway call ever happens.
    pub paid_amount: i64,
    pub status: PaymentStatus,
    pub card_type: Option<String>,
    pub card_no: Option<String>,
    pub transaction_key: Option<String>,
    pub failure_reason: Option<String>,
    pub pg_requested_at: DateTime<Utc>,
    pub pg_completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Transition to SUCCESS.
    pub fn to_success(
        &mut self,
        transaction_key: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<Applied> {
        match self.status {
            PaymentStatus::Success => Ok(Applied::AlreadyTerminal),
            PaymentStatus::Failed => Err(AppError::bad_request(format!(
                "payment {} is FAILED and cannot become SUCCESS",
                self.id
            ))),
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Success;
                if transaction_key.is_some() {
                    self.transaction_key = transaction_key;
                }
                self.pg_completed_at = Some(at);
                Ok(Applied::Transitioned)
            }
        }
    }

    /// Transition to FAILED, recording the reason.
    pub fn to_failed(&mut self, reason: &str, at: DateTime<Utc>) -> AppResult<Applied> {
        match self.status {
            PaymentStatus::Failed => Ok(Applied::AlreadyTerminal),
            PaymentStatus::Success => Err(AppError::bad_request(format!(
                "payment {} is SUCCESS and cannot become FAILED",
                self.id
            ))),
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Failed;
                self.failure_reason = Some(reason.to_string());
                self.pg_completed_at = Some(at);
                Ok(Applied::Transitioned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_payment() -> Payment {
        Payment {
            id: 1,
            order_id: 10,
            user_id: 100,
            total_amount: 10_000,
            used_point: 0,
            paid_amount: 10_000,
            status: PaymentStatus::Pending,
            card_type: Some("SAMSUNG".to_string()),
            card_no: Some("4111111111111111".to_string()),
            transaction_key: None,
            failure_reason: None,
            pg_requested_at: Utc::now(),
            pg_completed_at: None,
        }
    }

    #[test]
    fn test_success_transition_stamps_completion() {
        let mut p = pending_payment();
        let now = Utc::now();
        let applied = p.to_success(Some("tx-1".to_string()), now).unwrap();
        assert_eq!(applied, Applied::Transitioned);
        assert_eq!(p.status, PaymentStatus::Success);
        assert_eq!(p.transaction_key.as_deref(), Some("tx-1"));
        assert_eq!(p.pg_completed_at, Some(now));
    }

    #[test]
    fn test_success_twice_is_noop() {
        let mut p = pending_payment();
        p.to_success(Some("tx-1".to_string()), Utc::now()).unwrap();
        let applied = p.to_success(Some("tx-2".to_string()), Utc::now()).unwrap();
        assert_eq!(applied, Applied::AlreadyTerminal);
        // The first transaction key wins; the replay changes nothing.
        assert_eq!(p.transaction_key.as_deref(), Some("tx-1"));
    }

    #[test]
    fn test_cross_terminal_rejected() {
        let mut p = pending_payment();
        p.to_failed("LIMIT_EXCEEDED", Utc::now()).unwrap();
        let err = p.to_success(None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut q = pending_payment();
        q.to_success(None, Utc::now()).unwrap();
        assert!(q.to_failed("whatever", Utc::now()).is_err());
    }

    #[test]
    fn test_failed_records_reason() {
        let mut p = pending_payment();
        p.to_failed("INSUFFICIENT_FUNDS", Utc::now()).unwrap();
        assert_eq!(p.failure_reason.as_deref(), Some("INSUFFICIENT_FUNDS"));
        assert_eq!(
            p.to_failed("other", Utc::now()).unwrap(),
            Applied::AlreadyTerminal
        );
        assert_eq!(p.failure_reason.as_deref(), Some("INSUFFICIENT_FUNDS"));
    }
}
