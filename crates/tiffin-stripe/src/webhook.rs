//! # Stripe Webhook Handling
//!
//! `Stripe-Signature` verification and decoding of verified events into the
//! provider-neutral [`WebhookEvent`].
//!
//! The header looks like `t=1700000000,v1=<hex>,v1=<hex>`; the signed
//! message is `"{t}.{raw body}"` under HMAC-SHA256 with the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tiffin_core::{
    CheckoutError, CheckoutResult, CompletedCheckout, ExpiredCheckout, SessionMetadata,
    WebhookEvent, WebhookEventKind, ORDER_ID_METADATA_KEY, RESTAURANT_ID_METADATA_KEY,
};
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header Stripe sends the signature in
pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";

/// Events that should be enabled on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[CHECKOUT_COMPLETED, CHECKOUT_EXPIRED];

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_signature_header(header: &str) -> CheckoutResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            // undecodable entries can never match, skip them
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        CheckoutError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(CheckoutError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> CheckoutResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CheckoutError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Compute the hex `v1` signature for a payload (used by tests and tooling)
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> CheckoutResult<String> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header against the raw body at time `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> CheckoutResult<()> {
    let parsed = parse_signature_header(header)?;

    if now.saturating_sub(parsed.timestamp).saturating_abs() > tolerance_secs {
        return Err(CheckoutError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let mac = signed_mac(secret, parsed.timestamp, payload)?;

    // verify_slice compares in constant time
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());

    if !valid {
        return Err(CheckoutError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeSessionObject {
    id: String,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl StripeSessionObject {
    /// A session without an `orderId` cannot be matched to any order.
    fn session_metadata(&self) -> CheckoutResult<SessionMetadata> {
        let order_id = self
            .metadata
            .get(ORDER_ID_METADATA_KEY)
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or_else(|| {
                warn!(
                    "Session {} has no {} metadata",
                    self.id, ORDER_ID_METADATA_KEY
                );
                CheckoutError::OrderNotFound {
                    order_id: String::new(),
                }
            })?;

        Ok(SessionMetadata {
            order_id,
            restaurant_id: self.metadata.get(RESTAURANT_ID_METADATA_KEY).cloned(),
        })
    }
}

/// Decode an already verified Stripe event body.
///
/// Only a body that is not a Stripe event envelope is a parse error. A
/// checkout session that names no order is `OrderNotFound`; a completed
/// session without `amount_total` is acknowledged and left alone.
pub fn decode_event(payload: &[u8]) -> CheckoutResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        CheckoutError::WebhookParseError(format!("Failed to parse webhook: {}", e))
    })?;

    debug!("Decoding Stripe webhook: type={}", event.event_type);

    let kind = match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let session = session_object(event.data.object)?;
            let metadata = session.session_metadata()?;
            match session.amount_total {
                Some(amount_total) => WebhookEventKind::CheckoutCompleted(CompletedCheckout {
                    metadata,
                    session_id: session.id,
                    amount_total,
                }),
                None => {
                    warn!(
                        "Session {} for order {} has no amount_total, leaving order unchanged",
                        session.id, metadata.order_id
                    );
                    WebhookEventKind::Ignored {
                        event_type: event.event_type.clone(),
                    }
                }
            }
        }
        CHECKOUT_EXPIRED => {
            let session = session_object(event.data.object)?;
            WebhookEventKind::CheckoutExpired(ExpiredCheckout {
                metadata: session.session_metadata()?,
                session_id: session.id,
            })
        }
        other => WebhookEventKind::Ignored {
            event_type: other.to_string(),
        },
    };

    Ok(WebhookEvent {
        event_id: event.id,
        provider: "stripe".to_string(),
        kind,
    })
}

fn session_object(object: serde_json::Value) -> CheckoutResult<StripeSessionObject> {
    serde_json::from_value(object).map_err(|e| {
        warn!("Unreadable checkout session object: {}", e);
        CheckoutError::OrderNotFound {
            order_id: String::new(),
        }
    })
}

/// Print instructions for setting up webhooks
pub fn print_webhook_setup_instructions(endpoint_url: &str) {
    println!("=== Stripe Webhook Setup ===\n");
    println!("1. Go to: https://dashboard.stripe.com/webhooks\n");
    println!("2. Add endpoint: {}\n", endpoint_url);
    println!("3. Select these events:");
    for event in REQUIRED_WEBHOOK_EVENTS {
        println!("   - {}", event);
    }
    println!("\n4. Copy the signing secret (whsec_...) to STRIPE_WEBHOOK_SECRET");
    println!("\n5. For local testing, use Stripe CLI:");
    println!("   stripe listen --forward-to {}", endpoint_url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn completed_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": NOW,
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "amount_total": 11000,
                    "currency": "inr",
                    "payment_status": "paid",
                    "metadata": {
                        "orderId": "5f0c2f0e-4f7a-4d1b-9d59-3b8d2c1c9a11",
                        "restaurantId": "r-1"
                    }
                }
            }
        }))
        .unwrap()
    }

    fn header_for(body: &[u8], timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_signature(SECRET, timestamp, body).unwrap()
        )
    }

    #[test]
    fn test_valid_signature() {
        let body = completed_body();
        let header = header_for(&body, NOW);

        assert!(verify_signature(&body, &header, SECRET, NOW + 10, 300).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let body = completed_body();
        let good = compute_signature(SECRET, NOW, &body).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good);

        assert!(verify_signature(&body, &header, SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let body = completed_body();
        let header = header_for(&body, NOW);

        let mut tampered = body.clone();
        let pos = tampered.iter().position(|b| *b == b'1').unwrap();
        tampered[pos] = b'9';

        assert!(matches!(
            verify_signature(&tampered, &header, SECRET, NOW, 300),
            Err(CheckoutError::WebhookVerificationFailed(_))
        ));
    }

    #[test]
    fn test_tampered_header_rejected() {
        let body = completed_body();
        let header = header_for(&body, NOW);

        let shifted_time = header.replacen(&format!("t={}", NOW), &format!("t={}", NOW + 1), 1);
        let mut flipped_sig = header.clone();
        let last = flipped_sig.pop().unwrap();
        flipped_sig.push(if last == '0' { '1' } else { '0' });

        for bad in [shifted_time, flipped_sig, "garbage".to_string(), String::new()] {
            assert!(
                verify_signature(&body, &bad, SECRET, NOW, 300).is_err(),
                "header {bad:?} should fail"
            );
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = completed_body();
        let header = header_for(&body, NOW);

        assert!(verify_signature(&body, &header, "whsec_other", NOW, 300).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = completed_body();
        let header = header_for(&body, NOW - 301);

        assert!(matches!(
            verify_signature(&body, &header, SECRET, NOW, 300),
            Err(CheckoutError::WebhookVerificationFailed(msg)) if msg.contains("tolerance")
        ));
    }

    #[test]
    fn test_decode_completed() {
        let event = decode_event(&completed_body()).unwrap();

        assert_eq!(event.event_id, "evt_1");
        match event.kind {
            WebhookEventKind::CheckoutCompleted(c) => {
                assert_eq!(c.session_id, "cs_test_123");
                assert_eq!(c.amount_total, 11000);
                assert_eq!(c.metadata.order_id, "5f0c2f0e-4f7a-4d1b-9d59-3b8d2c1c9a11");
                assert_eq!(c.metadata.restaurant_id.as_deref(), Some("r-1"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_completed_without_amount_is_acknowledged() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "metadata": { "orderId": "x" } } }
        }))
        .unwrap();

        let event = decode_event(&body).unwrap();
        assert_eq!(
            event.kind,
            WebhookEventKind::Ignored {
                event_type: CHECKOUT_COMPLETED.into()
            }
        );
    }

    #[test]
    fn test_session_without_order_is_not_found() {
        let no_metadata = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "amount_total": 5 } }
        }))
        .unwrap();
        let empty_metadata = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "checkout.session.expired",
            "data": { "object": { "id": "cs_1", "metadata": {} } }
        }))
        .unwrap();
        let not_a_session = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": { "amount_total": "lots" } }
        }))
        .unwrap();

        for body in [no_metadata, empty_metadata, not_a_session] {
            assert!(matches!(
                decode_event(&body),
                Err(CheckoutError::OrderNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_non_event_body_is_parse_error() {
        assert!(matches!(
            decode_event(b"{\"hello\": 1}"),
            Err(CheckoutError::WebhookParseError(_))
        ));
    }

    #[test]
    fn test_decode_other_events_ignored() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_4",
            "type": "payment_intent.created",
            "data": { "object": { "anything": ["goes", 1] } }
        }))
        .unwrap();

        let event = decode_event(&body).unwrap();
        assert_eq!(
            event.kind,
            WebhookEventKind::Ignored {
                event_type: "payment_intent.created".into()
            }
        );
    }

    #[test]
    fn test_decode_expired() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_5",
            "type": "checkout.session.expired",
            "data": { "object": { "id": "cs_9", "metadata": { "orderId": "o-9" } } }
        }))
        .unwrap();

        let event = decode_event(&body).unwrap();
        assert_eq!(event.order_id(), Some("o-9"));
        assert!(matches!(event.kind, WebhookEventKind::CheckoutExpired(_)));
    }
}
