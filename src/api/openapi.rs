//! OpenAPI / Swagger UI documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use super::handlers::HealthResponse;
use super::types::{
    CallbackAck, CallbackRequest, CreateOrderRequest, OrderInfo, OrderItemInfo,
    OrderItemRequest, OrderSummary, PaymentInfo,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Orderflow Purchasing API",
        version = "1.0.0",
        description = "Purchasing core: order intake, point/stock reservation, gateway-driven payments, reconciliation.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::orders::create_order,
        crate::api::handlers::orders::list_orders,
        crate::api::handlers::orders::get_order,
        crate::api::handlers::orders::payment_callback,
    ),
    components(schemas(
        HealthResponse,
        CreateOrderRequest,
        OrderItemRequest,
        CallbackRequest,
        CallbackAck,
        OrderInfo,
        OrderItemInfo,
        OrderSummary,
        PaymentInfo,
    )),
    tags(
        (name = "Orders", description = "Purchase lifecycle"),
        (name = "Health", description = "Probes"),
    )
)]
pub struct ApiDoc;
