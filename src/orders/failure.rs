//! Payment failure classification
//!
//! Every gateway decline falls into exactly one of two buckets. Business
//! failures cancel the order; external-system failures leave it PENDING
//! for reconciliation, because only ledger evidence may advance a PENDING
//! order.

use crate::paygate::PgFailure;

/// Error codes that conclusively mean the payment cannot succeed for this
/// request, matched by substring.
const BUSINESS_FAILURE_CODES: [&str; 5] = [
    "LIMIT_EXCEEDED",
    "INVALID_CARD",
    "CARD_ERROR",
    "INSUFFICIENT_FUNDS",
    "PAYMENT_FAILED",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying cannot help; cancel the order and restore stock/point.
    Business,
    /// Outcome unknown or infrastructure-level; keep the order PENDING.
    ExternalSystem,
}

pub fn classify(failure: &PgFailure) -> FailureKind {
    if failure.is_timeout {
        return FailureKind::ExternalSystem;
    }
    if BUSINESS_FAILURE_CODES
        .iter()
        .any(|code| failure.error_code.contains(code))
    {
        FailureKind::Business
    } else {
        FailureKind::ExternalSystem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paygate::{CIRCUIT_BREAKER_OPEN, PgFailure};

    fn failure(code: &str) -> PgFailure {
        PgFailure {
            error_code: code.to_string(),
            message: String::new(),
            is_timeout: false,
            is_retryable: false,
        }
    }

    #[test]
    fn test_business_codes() {
        for code in [
            "LIMIT_EXCEEDED",
            "INVALID_CARD",
            "CARD_ERROR",
            "INSUFFICIENT_FUNDS",
            "PAYMENT_FAILED",
        ] {
            assert_eq!(classify(&failure(code)), FailureKind::Business, "{code}");
        }
        // Substring match, as gateways wrap codes in context.
        assert_eq!(
            classify(&failure("PG_LIMIT_EXCEEDED_DAILY")),
            FailureKind::Business
        );
    }

    #[test]
    fn test_external_system_codes() {
        for code in [CIRCUIT_BREAKER_OPEN, "HTTP_503", "CONNECTION_ERROR", "UNKNOWN"] {
            assert_eq!(
                classify(&failure(code)),
                FailureKind::ExternalSystem,
                "{code}"
            );
        }
    }

    #[test]
    fn test_timeout_is_external_even_with_business_text() {
        let mut f = failure("PAYMENT_FAILED");
        f.is_timeout = true;
        // A timed-out request proves nothing about the business outcome.
        assert_eq!(classify(&f), FailureKind::ExternalSystem);
    }
}
