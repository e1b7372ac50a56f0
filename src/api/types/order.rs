//! Order API DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Order, OrderItem};
use crate::orders::OrderDetail;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "items must not be empty"), nested)]
    pub items: Vec<OrderItemRequest>,
    /// Point to spend on this order; defaults to 0.
    #[serde(default)]
    #[validate(range(min = 0, message = "usedPoint must not be negative"))]
    pub used_point: i64,
    #[schema(example = "SAMSUNG")]
    pub card_type: Option<String>,
    #[schema(example = "4111-1111-1111-1111")]
    pub card_no: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
    pub coupon_code: Option<String>,
}

/// Gateway-initiated status push.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub transaction_key: Option<String>,
    /// Padded order id as carried on the gateway wire.
    #[schema(example = "000042")]
    pub order_id: String,
    #[schema(example = "SUCCESS")]
    pub status: String,
    pub reason: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInfo {
    pub product_id: i64,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
}

impl From<&OrderItem> for OrderItemInfo {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_id: i64,
    pub status: String,
    pub total_amount: i64,
    pub used_point: i64,
    pub paid_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub order_id: i64,
    pub status: String,
    pub total_amount: i64,
    pub discount_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub items: Vec<OrderItemInfo>,
    pub payment: PaymentInfo,
}

impl From<OrderDetail> for OrderInfo {
    fn from(detail: OrderDetail) -> Self {
        let OrderDetail { order, payment } = detail;
        Self {
            order_id: order.id,
            status: order.status.as_str().to_string(),
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            coupon_code: order.coupon_code,
            items: order.items.iter().map(OrderItemInfo::from).collect(),
            payment: PaymentInfo {
                payment_id: payment.id,
                status: payment.status.as_str().to_string(),
                total_amount: payment.total_amount,
                used_point: payment.used_point,
                paid_amount: payment.paid_amount,
                transaction_key: payment.transaction_key,
                failure_reason: payment.failure_reason,
            },
        }
    }
}

/// List row: the order without its payment detail.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: i64,
    pub status: String,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub item_count: usize,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status.as_str().to_string(),
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            item_count: order.items.len(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CallbackAck {
    pub received: bool,
}
