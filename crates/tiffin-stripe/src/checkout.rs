//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API.
//! The diner pays on Stripe's hosted page; we only create the session and
//! later verify the webhook Stripe sends back.

use crate::config::StripeConfig;
use crate::webhook::{decode_event, verify_signature, SIGNATURE_HEADER};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tiffin_core::{
    CheckoutError, CheckoutResult, CheckoutSession, PaymentGateway, SessionRequest,
    WebhookEvent, ORDER_ID_METADATA_KEY, RESTAURANT_ID_METADATA_KEY,
};
use tracing::{debug, error, info, instrument};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Stripe Checkout Session gateway
///
/// Uses Stripe's hosted checkout page for secure payments.
pub struct StripeCheckoutGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutGateway {
    /// Create a new Stripe checkout gateway
    pub fn new(config: StripeConfig) -> CheckoutResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                CheckoutError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Form body for `POST /v1/checkout/sessions`
    fn session_form(request: &SessionRequest) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form_params.push((
                format!("line_items[{}][price_data][currency]", i),
                request.currency.clone(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_amount.to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            form_params.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }

        // Delivery is a single fixed-amount shipping option
        let rate = "shipping_options[0][shipping_rate_data]";
        form_params.push((format!("{}[display_name]", rate), "Delivery".to_string()));
        form_params.push((format!("{}[type]", rate), "fixed_amount".to_string()));
        form_params.push((
            format!("{}[fixed_amount][amount]", rate),
            request.delivery_fee.to_string(),
        ));
        form_params.push((
            format!("{}[fixed_amount][currency]", rate),
            request.currency.clone(),
        ));

        if let Some(ref email) = request.customer_email {
            form_params.push(("customer_email".to_string(), email.clone()));
        }

        form_params.push((
            format!("metadata[{}]", ORDER_ID_METADATA_KEY),
            request.order_id.to_string(),
        ));
        form_params.push((
            format!("metadata[{}]", RESTAURANT_ID_METADATA_KEY),
            request.restaurant_id.clone(),
        ));

        form_params
    }
}

#[async_trait]
impl PaymentGateway for StripeCheckoutGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_session(&self, request: &SessionRequest) -> CheckoutResult<CheckoutSession> {
        if request.line_items.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "Order has no items".to_string(),
            ));
        }

        let form_params = Self::session_form(request);
        debug!(
            "Creating Stripe checkout session: {} items",
            request.line_items.len()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        // one session per order even if the caller retries
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", request.order_id.to_string())
            .form(&form_params)
            .send()
            .await
            .map_err(|e| CheckoutError::session_failed(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::session_failed(format!("Network error: {}", e)))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(CheckoutError::session_failed(error_response.error.message));
            }

            return Err(CheckoutError::session_failed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let session_response: StripeCheckoutSessionResponse = serde_json::from_str(&body)
            .map_err(|e| {
                CheckoutError::session_failed(format!("Failed to parse Stripe response: {}", e))
            })?;

        let checkout_url = session_response.url.ok_or_else(|| {
            error!("Stripe session {} has no url", session_response.id);
            CheckoutError::session_failed("Error creating stripe session")
        })?;

        info!(
            "Created Stripe checkout session: id={}, order={}",
            session_response.id, request.order_id
        );

        Ok(CheckoutSession {
            session_id: session_response.id,
            order_id: request.order_id,
            provider: "stripe".to_string(),
            checkout_url,
            expires_at: session_response
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> CheckoutResult<WebhookEvent> {
        verify_signature(
            payload,
            signature,
            &self.config.webhook_secret,
            Utc::now().timestamp(),
            self.config.webhook_tolerance_secs,
        )?;

        decode_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
