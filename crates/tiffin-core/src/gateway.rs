//! # Payment Gateway Trait
//!
//! Seam between the checkout flow and the payment provider. The provider
//! hosts the payment page; we only create sessions and verify the webhook
//! events it sends back.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            PaymentGateway (trait)            │
//! │  ├── create_session()                        │
//! │  ├── verify_webhook()                        │
//! │  └── provider_name()                         │
//! └──────────────────────────────────────────────┘
//!                       ▲
//!               ┌───────┴────────┐
//!               │ StripeCheckout │
//!               │    Gateway     │
//!               └────────────────┘
//! ```

use crate::error::CheckoutResult;
use crate::event::WebhookEvent;
use crate::order::OrderId;
use crate::pricing::LineItem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the provider needs to open a hosted checkout
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Priced line items (provider minor units)
    pub line_items: Vec<LineItem>,

    /// Order id echoed back in webhook metadata
    pub order_id: OrderId,

    /// Restaurant id echoed back in webhook metadata
    pub restaurant_id: String,

    /// Flat delivery fee, already in provider minor units
    pub delivery_fee: i64,

    /// ISO 4217 currency code (lowercase)
    pub currency: String,

    /// Customer email for prefill
    pub customer_email: Option<String>,

    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session created by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Our order ID
    pub order_id: OrderId,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect the diner to
    pub checkout_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// Fails with `SessionCreationFailed` carrying the provider's message,
    /// including when the provider returns a session without a URL.
    async fn create_session(&self, request: &SessionRequest) -> CheckoutResult<CheckoutSession>;

    /// Verify the raw webhook body against its signature header and decode it.
    ///
    /// Verification happens before the body is parsed.
    async fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> CheckoutResult<WebhookEvent>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;

    /// Header carrying the webhook signature
    fn signature_header(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type SharedPaymentGateway = Arc<dyn PaymentGateway>;

/// Redirect targets on the diner-facing frontend
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Frontend base URL (e.g., "https://tiffincart.app")
    pub frontend_url: String,
}

impl CheckoutUrls {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}/order-status?success=true", self.frontend_url)
    }

    /// Cancelling sends the diner back to the restaurant page
    pub fn cancel_url(&self, restaurant_id: &str) -> String {
        format!(
            "{}/detail/{}?cancelled=true",
            self.frontend_url, restaurant_id
        )
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:5173")
    }
}
