//! In-process payment-gateway simulator (`mock-pg` feature)
//!
//! Mounted by the binary for local development and demos so the full
//! request → callback → ledger loop runs without a real gateway. Magic
//! inputs steer the outcome:
//!
//! - amount ending in 99   -> `LIMIT_EXCEEDED`
//! - amount ending in 98   -> `INSUFFICIENT_FUNDS`
//! - card prefix `9999`    -> `INVALID_CARD`
//!
//! Everything else is approved and recorded SUCCESS in the in-memory
//! ledger the status endpoints serve from.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct LedgerEntry {
    transaction_key: String,
    order_id: String,
    status: &'static str,
    amount: i64,
    reason: Option<String>,
}

#[derive(Default)]
pub struct SimulatorState {
    ledger: DashMap<String, LedgerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimPaymentRequest {
    order_id: String,
    card_no: String,
    amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimApproved {
    transaction_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimDeclined {
    error_code: &'static str,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(rename = "orderId")]
    order_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimStatus {
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimTransaction {
    transaction_key: String,
    order_id: String,
    status: &'static str,
    amount: i64,
    reason: Option<String>,
}

fn declined(code: &'static str, message: &'static str) -> (StatusCode, Json<SimDeclined>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(SimDeclined {
            error_code: code,
            message,
        }),
    )
}

async fn request_payment(
    State(state): State<Arc<SimulatorState>>,
    Json(req): Json<SimPaymentRequest>,
) -> Result<Json<SimApproved>, (StatusCode, Json<SimDeclined>)> {
    let (status, reason, decline) = if req.amount % 100 == 99 {
        ("FAILED", Some("LIMIT_EXCEEDED"), Some(declined("LIMIT_EXCEEDED", "card limit exceeded")))
    } else if req.amount % 100 == 98 {
        ("FAILED", Some("INSUFFICIENT_FUNDS"), Some(declined("INSUFFICIENT_FUNDS", "not enough funds")))
    } else if req.card_no.starts_with("9999") {
        ("FAILED", Some("INVALID_CARD"), Some(declined("INVALID_CARD", "card rejected")))
    } else {
        ("SUCCESS", None, None)
    };

    let transaction_key = Uuid::new_v4().to_string();
    state.ledger.insert(
        req.order_id.clone(),
        LedgerEntry {
            transaction_key: transaction_key.clone(),
            order_id: req.order_id.clone(),
            status,
            amount: req.amount,
            reason: reason.map(str::to_string),
        },
    );

    tracing::info!(order_id = %req.order_id, status, "simulator processed payment");

    match decline {
        Some(d) => Err(d),
        None => Ok(Json(SimApproved { transaction_key })),
    }
}

async fn status_by_order(
    State(state): State<Arc<SimulatorState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SimStatus>, StatusCode> {
    state
        .ledger
        .get(&query.order_id)
        .map(|entry| Json(SimStatus { status: entry.status }))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn status_by_transaction(
    State(state): State<Arc<SimulatorState>>,
    Path(transaction_key): Path<String>,
) -> Result<Json<SimTransaction>, StatusCode> {
    state
        .ledger
        .iter()
        .find(|entry| entry.transaction_key == transaction_key)
        .map(|entry| {
            Json(SimTransaction {
                transaction_key: entry.transaction_key.clone(),
                order_id: entry.order_id.clone(),
                status: entry.status,
                amount: entry.amount,
                reason: entry.reason.clone(),
            })
        })
        .ok_or(StatusCode::NOT_FOUND)
}

/// Router serving the simulated gateway; nest it under the path the
/// configured gateway base URL points at.
pub fn router() -> Router {
    let state = Arc::new(SimulatorState::default());
    Router::new()
        .route("/payments", post(request_payment).get(status_by_order))
        .route("/payments/{transaction_key}", get(status_by_transaction))
        .with_state(state)
}
