//! # tiffin-core
//!
//! Checkout and payment reconciliation for the tiffin-cart food ordering
//! platform.
//!
//! This crate provides:
//! - `build_line_items` and `Pricing` for deterministic cart pricing
//! - `Order`, `OrderStatus` and the `OrderStore` lifecycle trait
//! - `RestaurantDirectory` for read-only menu lookups
//! - `PaymentGateway` for provider-hosted checkout sessions
//! - `CheckoutService` and `WebhookReconciler` tying them together
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use tiffin_core::{CheckoutService, WebhookReconciler};
//!
//! let checkout = CheckoutService::new(restaurants, gateway.clone(), orders.clone(), pricing, urls);
//! let outcome = checkout.create_checkout_session(&user_id, request).await?;
//! // Redirect the diner to outcome.checkout_url
//!
//! // Later, in the webhook endpoint:
//! let reconciler = WebhookReconciler::new(gateway, orders);
//! reconciler.handle(&raw_body, signature).await?;
//! ```

pub mod checkout;
pub mod error;
pub mod event;
pub mod gateway;
pub mod order;
pub mod pricing;
pub mod reconcile;
pub mod restaurant;
pub mod store;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use checkout::{CheckoutOutcome, CheckoutRequest, CheckoutService};
pub use error::{CheckoutError, CheckoutResult};
pub use event::{
    CompletedCheckout, ExpiredCheckout, SessionMetadata, WebhookEvent, WebhookEventKind,
    ORDER_ID_METADATA_KEY, RESTAURANT_ID_METADATA_KEY,
};
pub use gateway::{
    CheckoutSession, CheckoutUrls, PaymentGateway, SessionRequest, SharedPaymentGateway,
};
pub use order::{DeliveryDetails, NewOrder, Order, OrderId, OrderItem, OrderStatus, StatusChange};
pub use pricing::{build_line_items, items_total, CartItem, LineItem, Pricing};
pub use reconcile::{ReconcileOutcome, WebhookReconciler};
pub use restaurant::{MenuItem, Restaurant, RestaurantCatalog, RestaurantDirectory};
pub use store::{MemoryOrderStore, OrderStore, SharedOrderStore};
