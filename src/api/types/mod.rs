//! API types: response envelope and order DTOs

pub mod order;
pub mod response;

pub use order::{
    CallbackAck, CallbackRequest, CreateOrderRequest, OrderInfo, OrderItemInfo,
    OrderItemRequest, OrderSummary, PaymentInfo,
};
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};
