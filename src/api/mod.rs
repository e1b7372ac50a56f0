//! HTTP API
//!
//! axum router for the purchasing surface. With the `mock-pg` feature the
//! in-process gateway simulator is nested under `/mock-pg` so the full
//! request → callback → ledger loop runs locally.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let order_routes = Router::new()
        .route("/orders", post(handlers::create_order).get(handlers::list_orders))
        .route("/orders/{id}", get(handlers::get_order))
        .route("/orders/{id}/callback", post(handlers::payment_callback));

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", order_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    #[cfg(feature = "mock-pg")]
    let app = app.nest("/mock-pg", crate::paygate::simulator::router());

    app
}

/// Bind and serve until the process exits.
pub async fn run_server(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
