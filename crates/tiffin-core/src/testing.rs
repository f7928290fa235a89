//! Test doubles shared by the unit tests of this crate.

use crate::error::{CheckoutError, CheckoutResult};
use crate::event::{CompletedCheckout, ExpiredCheckout, SessionMetadata, WebhookEvent, WebhookEventKind};
use crate::gateway::{CheckoutSession, PaymentGateway, SessionRequest};
use crate::restaurant::{MenuItem, Restaurant, RestaurantCatalog};
use async_trait::async_trait;
use std::sync::Mutex;

pub const VALID_SIGNATURE: &str = "valid";

/// Gateway that records session requests and trusts one fixed signature.
/// Webhook payloads are `WebhookEvent` JSON.
pub struct FakeGateway {
    fail_with: Option<String>,
    requests: Mutex<Vec<SessionRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<SessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: &SessionRequest) -> CheckoutResult<CheckoutSession> {
        if let Some(message) = &self.fail_with {
            return Err(CheckoutError::session_failed(message.clone()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            session_id: format!("cs_{}", request.order_id),
            order_id: request.order_id,
            provider: "fake".into(),
            checkout_url: format!("https://pay.test/{}", request.order_id),
            expires_at: None,
        })
    }

    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> CheckoutResult<WebhookEvent> {
        if signature != VALID_SIGNATURE {
            return Err(CheckoutError::WebhookVerificationFailed(
                "Signature mismatch".into(),
            ));
        }
        serde_json::from_slice(payload).map_err(|e| CheckoutError::WebhookParseError(e.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn signature_header(&self) -> &'static str {
        "fake-signature"
    }
}

pub fn sample_catalog() -> RestaurantCatalog {
    RestaurantCatalog::new().with_restaurant(
        Restaurant::new("r-1", "Spice Route", 20)
            .with_city("Pune")
            .with_menu_item(MenuItem::new("A", "Paneer Tikka", 100))
            .with_menu_item(MenuItem::new("B", "Masala Dosa", 60)),
    )
}

pub fn completed_event(order_id: &str, amount_total: i64) -> Vec<u8> {
    serde_json::to_vec(&WebhookEvent {
        event_id: "evt_completed".into(),
        provider: "fake".into(),
        kind: WebhookEventKind::CheckoutCompleted(CompletedCheckout {
            session_id: "cs_1".into(),
            amount_total,
            metadata: SessionMetadata {
                order_id: order_id.into(),
                restaurant_id: Some("r-1".into()),
            },
        }),
    })
    .unwrap()
}

pub fn expired_event(order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&WebhookEvent {
        event_id: "evt_expired".into(),
        provider: "fake".into(),
        kind: WebhookEventKind::CheckoutExpired(ExpiredCheckout {
            session_id: "cs_1".into(),
            metadata: SessionMetadata {
                order_id: order_id.into(),
                restaurant_id: Some("r-1".into()),
            },
        }),
    })
    .unwrap()
}
