//! Order endpoints
//!
//! Callers are identified by the `X-USER-ID` header carrying the external
//! user token.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use validator::Validate;

use crate::orders::{CallbackCommand, CreateOrderCommand, OrderLine};
use crate::paygate::PgPaymentStatus;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CallbackAck, CallbackRequest, CreateOrderRequest, OrderInfo,
    OrderSummary, ok,
};

const USER_HEADER: &str = "X-USER-ID";

fn extract_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("missing X-USER-ID header"))
}

/// Create an order
///
/// POST /api/v1/orders
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created; payment driven after commit", body = OrderInfo),
        (status = 400, description = "Validation failure (quantity, point, card)"),
        (status = 404, description = "User, product or coupon not found"),
        (status = 409, description = "Coupon already used")
    ),
    params(("X-USER-ID" = String, Header, description = "External user token")),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<OrderInfo> {
    let external_user_id = extract_user(&headers)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let cmd = CreateOrderCommand {
        external_user_id,
        items: req
            .items
            .into_iter()
            .map(|i| OrderLine {
                product_id: i.product_id,
                quantity: i.quantity,
                coupon_code: i.coupon_code,
            })
            .collect(),
        used_point: req.used_point,
        card_type: req.card_type,
        card_no: req.card_no,
    };

    match state.orders.clone().create_order(cmd).await {
        Ok(detail) => ok(OrderInfo::from(detail)),
        Err(e) => ApiError::from(e).into_err(),
    }
}

/// List the caller's orders
///
/// GET /api/v1/orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders, newest first", body = Vec<OrderSummary>),
        (status = 404, description = "User not found")
    ),
    params(("X-USER-ID" = String, Header, description = "External user token")),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<OrderSummary>> {
    let external_user_id = extract_user(&headers)?;

    match state.orders.get_orders(&external_user_id).await {
        Ok(orders) => ok(orders.iter().map(OrderSummary::from).collect()),
        Err(e) => ApiError::from(e).into_err(),
    }
}

/// Fetch one order
///
/// GET /api/v1/orders/{id}
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order id"),
        ("X-USER-ID" = String, Header, description = "External user token")
    ),
    responses(
        (status = 200, description = "Order with payment detail", body = OrderInfo),
        (status = 404, description = "Order not found or not owned by caller")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> ApiResult<OrderInfo> {
    let external_user_id = extract_user(&headers)?;

    match state.orders.get_order(&external_user_id, order_id).await {
        Ok(detail) => ok(OrderInfo::from(detail)),
        Err(e) => ApiError::from(e).into_err(),
    }
}

/// Gateway status callback
///
/// POST /api/v1/orders/{id}/callback
///
/// The callback is a hint; the gateway ledger is cross-checked and wins on
/// disagreement. Replays against an already-terminal order return 200.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/callback",
    params(("id" = i64, Path, description = "Order id")),
    request_body = CallbackRequest,
    responses(
        (status = 200, description = "Callback accepted (also for terminal replays)", body = CallbackAck),
        (status = 400, description = "Malformed callback body")
    ),
    tag = "Orders"
)]
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
    Json(req): Json<CallbackRequest>,
) -> ApiResult<CallbackAck> {
    let status = PgPaymentStatus::from_wire(&req.status)
        .ok_or_else(|| ApiError::bad_request(format!("unknown callback status: {}", req.status)))?;

    let cmd = CallbackCommand {
        transaction_key: req.transaction_key,
        order_id: req.order_id,
        status,
        reason: req.reason,
    };

    match state.orders.handle_callback(order_id, cmd).await {
        Ok(()) => ok(CallbackAck { received: true }),
        Err(e) => ApiError::from(e).into_err(),
    }
}
