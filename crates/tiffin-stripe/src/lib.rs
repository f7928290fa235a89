//! # tiffin-stripe
//!
//! Stripe payment gateway for tiffin-cart.
//!
//! **StripeCheckoutGateway** implements `tiffin_core::PaymentGateway` on top
//! of the Checkout Sessions API:
//! - Dynamic line items priced from the restaurant menu
//! - A fixed-amount delivery shipping option
//! - `orderId` / `restaurantId` metadata echoed back in webhooks
//! - `Stripe-Signature` verification before any event parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tiffin_stripe::StripeCheckoutGateway;
//! use tiffin_core::PaymentGateway;
//!
//! let gateway = StripeCheckoutGateway::from_env()?;
//! let session = gateway.create_session(&request).await?;
//! // Redirect the diner to session.checkout_url
//!
//! // In the webhook endpoint:
//! let event = gateway.verify_webhook(&raw_body, signature).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutGateway;
pub use config::StripeConfig;
pub use webhook::{
    compute_signature, decode_event, print_webhook_setup_instructions, verify_signature,
    REQUIRED_WEBHOOK_EVENTS, SIGNATURE_HEADER,
};
