//! # Webhook Events
//!
//! Provider-neutral view of a verified webhook event. Only the variants the
//! reconciler acts on carry a strict schema; everything else is kept as its
//! raw type name and ignored.

use serde::{Deserialize, Serialize};

/// Metadata key carrying our order id through the provider
pub const ORDER_ID_METADATA_KEY: &str = "orderId";

/// Metadata key carrying the restaurant id through the provider
pub const RESTAURANT_ID_METADATA_KEY: &str = "restaurantId";

/// Metadata echoed back by the provider from session creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "orderId")]
    pub order_id: String,

    #[serde(rename = "restaurantId", default)]
    pub restaurant_id: Option<String>,
}

/// A checkout session the diner paid for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCheckout {
    /// Provider session id
    pub session_id: String,

    /// Settled total in provider minor units
    pub amount_total: i64,

    pub metadata: SessionMetadata,
}

/// A checkout session that expired without payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredCheckout {
    pub session_id: String,
    pub metadata: SessionMetadata,
}

/// Event kinds the reconciler distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookEventKind {
    CheckoutCompleted(CompletedCheckout),
    CheckoutExpired(ExpiredCheckout),
    /// Any other event type, acknowledged without action
    Ignored { event_type: String },
}

/// A verified webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the provider
    pub event_id: String,

    /// Provider name (e.g. "stripe")
    pub provider: String,

    pub kind: WebhookEventKind,
}

impl WebhookEvent {
    /// The order id echoed in metadata, if the event carries one
    pub fn order_id(&self) -> Option<&str> {
        match &self.kind {
            WebhookEventKind::CheckoutCompleted(c) => Some(c.metadata.order_id.as_str()),
            WebhookEventKind::CheckoutExpired(e) => Some(e.metadata.order_id.as_str()),
            WebhookEventKind::Ignored { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &str {
        match &self.kind {
            WebhookEventKind::CheckoutCompleted(_) => "checkout_completed",
            WebhookEventKind::CheckoutExpired(_) => "checkout_expired",
            WebhookEventKind::Ignored { event_type } => event_type,
        }
    }
}
