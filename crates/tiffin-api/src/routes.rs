//! # Routes
//!
//! Axum router configuration for the ordering API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - GET  /health
/// - POST /api/order/checkout/create-checkout-session
/// - POST /api/order/checkout/webhook (raw body, signature verified)
/// - GET  /api/order
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/order", get(handlers::get_my_orders))
        .route(
            "/api/order/checkout/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route(
            "/api/order/checkout/webhook",
            post(handlers::stripe_webhook),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Only the frontend origin may call the API from a browser
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}
