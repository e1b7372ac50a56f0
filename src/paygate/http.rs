//! HTTP payment gateway adapter
//!
//! reqwest-based implementation of the [`PaymentGateway`] port. One fixed
//! deadline per request; expiry surfaces as a decline with
//! `is_timeout = true`. The circuit breaker guards the payment-request
//! path only; the status paths stay open so reconciliation can always
//! reach the ledger. Business declines (a well-formed 4xx answer) count
//! as breaker successes, transport failures and 5xx count against it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::circuit_breaker::CircuitBreaker;
use super::{
    PaymentGateway, PgCallResult, PgCommand, PgFailure, PgPaymentStatus, PgTransaction,
};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestBody<'a> {
    order_id: &'a str,
    card_type: &'a str,
    card_no: &'a str,
    amount: i64,
    callback_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentAcceptedBody {
    transaction_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerStatusBody {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerTransactionBody {
    transaction_key: String,
    order_id: String,
    status: String,
    amount: i64,
    reason: Option<String>,
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        breaker: Arc<CircuitBreaker>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("failed to build http client: {e}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            breaker,
        })
    }

    fn decline_from_transport(&self, err: &reqwest::Error) -> PgFailure {
        self.breaker.record_failure();
        if err.is_timeout() {
            PgFailure::timeout(format!("gateway request timed out: {err}"))
        } else {
            PgFailure {
                error_code: "CONNECTION_ERROR".to_string(),
                message: err.to_string(),
                is_timeout: false,
                is_retryable: true,
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn request_payment(&self, cmd: &PgCommand) -> PgCallResult {
        if !self.breaker.try_acquire() {
            return PgCallResult::Declined(PgFailure::breaker_open());
        }

        let padded = super::pad_order_id(cmd.order_id);
        let body = PaymentRequestBody {
            order_id: &padded,
            card_type: &cmd.card_type,
            card_no: &cmd.card_no,
            amount: cmd.amount,
            callback_url: &cmd.callback_url,
        };

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .header("X-USER-ID", &cmd.external_user_id)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return PgCallResult::Declined(self.decline_from_transport(&e)),
        };

        let status = response.status();
        if status.is_success() {
            match response.json::<PaymentAcceptedBody>().await {
                Ok(accepted) => {
                    self.breaker.record_success();
                    PgCallResult::Approved {
                        transaction_key: accepted.transaction_key,
                    }
                }
                Err(e) => {
                    self.breaker.record_failure();
                    PgCallResult::Declined(PgFailure {
                        error_code: "INVALID_RESPONSE".to_string(),
                        message: format!("gateway returned unparsable body: {e}"),
                        is_timeout: false,
                        is_retryable: true,
                    })
                }
            }
        } else if status.is_server_error() {
            self.breaker.record_failure();
            PgCallResult::Declined(PgFailure {
                error_code: format!("HTTP_{}", status.as_u16()),
                message: "gateway server error".to_string(),
                is_timeout: false,
                is_retryable: true,
            })
        } else {
            // A well-formed decline is a gateway answer, not a gateway outage.
            self.breaker.record_success();
            let parsed = response.json::<PaymentErrorBody>().await.unwrap_or(
                PaymentErrorBody {
                    error_code: None,
                    message: None,
                },
            );
            PgCallResult::Declined(PgFailure {
                error_code: parsed
                    .error_code
                    .unwrap_or_else(|| format!("HTTP_{}", status.as_u16())),
                message: parsed.message.unwrap_or_default(),
                is_timeout: false,
                is_retryable: false,
            })
        }
    }

    async fn status_by_order(
        &self,
        external_user_id: &str,
        padded_order_id: &str,
    ) -> AppResult<PgPaymentStatus> {
        let response = self
            .client
            .get(format!("{}/payments", self.base_url))
            .query(&[("orderId", padded_order_id)])
            .header("X-USER-ID", external_user_id)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("gateway status lookup failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(PgPaymentStatus::NotFound);
        }
        if !response.status().is_success() {
            return Err(AppError::internal(format!(
                "gateway status lookup returned {}",
                response.status()
            )));
        }

        let body: LedgerStatusBody = response
            .json()
            .await
            .map_err(|e| AppError::internal(format!("unparsable ledger status: {e}")))?;

        PgPaymentStatus::from_wire(&body.status)
            .ok_or_else(|| AppError::internal(format!("unknown ledger status: {}", body.status)))
    }

    async fn status_by_transaction(
        &self,
        external_user_id: &str,
        transaction_key: &str,
    ) -> AppResult<PgTransaction> {
        let response = self
            .client
            .get(format!("{}/payments/{transaction_key}", self.base_url))
            .header("X-USER-ID", external_user_id)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("gateway transaction lookup failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!(
                "transaction not found: {transaction_key}"
            )));
        }
        if !response.status().is_success() {
            return Err(AppError::internal(format!(
                "gateway transaction lookup returned {}",
                response.status()
            )));
        }

        let body: LedgerTransactionBody = response
            .json()
            .await
            .map_err(|e| AppError::internal(format!("unparsable ledger record: {e}")))?;

        let status = PgPaymentStatus::from_wire(&body.status)
            .ok_or_else(|| AppError::internal(format!("unknown ledger status: {}", body.status)))?;

        Ok(PgTransaction {
            transaction_key: body.transaction_key,
            order_id: body.order_id,
            status,
            amount: body.amount,
            reason: body.reason,
        })
    }
}
