//! # tiffin-api
//!
//! HTTP API layer for tiffin-cart.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout session creation and order history endpoints
//! - The Stripe webhook endpoint that settles orders
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/order/checkout/create-checkout-session` | Create checkout session |
//! | POST | `/api/order/checkout/webhook` | Stripe webhook |
//! | GET | `/api/order` | List the caller's orders |
//!
//! Every `/api/order` route except the webhook expects the authenticated
//! user id in `X-User-Id`.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
