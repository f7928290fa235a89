//! # Request Handlers
//!
//! Axum request handlers for checkout, the payment webhook and order history.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tiffin_core::{CheckoutError, CheckoutRequest, Order, ReconcileOutcome};
use tracing::{error, info, instrument, warn};

/// Header carrying the user id forwarded by the auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Hosted payment page (redirect the diner here)
    pub url: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Restaurant fields embedded in order history
#[derive(Debug, Serialize)]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Serialize)]
pub struct UserRef {
    pub id: String,
}

/// An order as returned by `GET /api/order`
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    /// None when the restaurant has since left the catalog
    pub restaurant: Option<RestaurantSummary>,
    pub user: UserRef,
}

/// `CheckoutError` rendered as `{ "message": ... }` with its status code
#[derive(Debug)]
pub struct ApiError(pub CheckoutError);

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self.0 {
            CheckoutError::SessionCreationFailed { message } => message.clone(),
            CheckoutError::Storage(_) | CheckoutError::Configuration(_) => {
                error!("Request failed: {}", self.0);
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Authenticated caller, taken from the `X-User-Id` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| AuthUser(v.to_string()))
            .ok_or_else(|| ApiError(CheckoutError::Unauthorized("Missing user identity".into())))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tiffin-cart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a checkout session for the caller's cart
#[instrument(skip(state, payload))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| CheckoutError::InvalidRequest(e.body_text()))?;

    let outcome = state
        .checkout
        .create_checkout_session(&user_id, request)
        .await
        .map_err(|e| {
            if !e.is_client_error() {
                error!("Failed to create checkout: {}", e);
            }
            e
        })?;

    info!(
        "Created checkout session: order={}, session={}",
        outcome.order.id, outcome.session_id
    );

    Ok(Json(CreateCheckoutResponse {
        url: outcome.checkout_url,
    }))
}

/// Handle the payment provider webhook
///
/// The body is taken as raw bytes so the signature is checked over exactly
/// what the provider sent.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let header_name = state.reconciler.signature_header();
    let signature = headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            CheckoutError::WebhookVerificationFailed(format!("Missing {} header", header_name))
        })?;

    let outcome = state
        .reconciler
        .handle(&body, signature)
        .await
        .map_err(|e| {
            warn!("Webhook rejected: {}", e);
            e
        })?;

    match outcome {
        ReconcileOutcome::Paid { order_id, amount } => {
            info!("Webhook settled order {} (amount {})", order_id, amount)
        }
        ReconcileOutcome::Cancelled { order_id } => {
            info!("Webhook cancelled order {}", order_id)
        }
        ReconcileOutcome::Unchanged { order_id, status } => {
            info!("Webhook left order {} as {}", order_id, status)
        }
        ReconcileOutcome::Ignored { event_type } => {
            info!("Webhook event {} acknowledged", event_type)
        }
    }

    Ok(StatusCode::OK)
}

/// List the caller's orders, newest first
#[instrument(skip(state))]
pub async fn get_my_orders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orders.find_all_by_user(&user_id).await?;

    let views = orders
        .into_iter()
        .map(|order| {
            let restaurant = state
                .restaurants
                .get(&order.restaurant_id)
                .map(|r| RestaurantSummary {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    city: r.city.clone(),
                });
            OrderView {
                user: UserRef {
                    id: order.user_id.clone(),
                },
                restaurant,
                order,
            }
        })
        .collect();

    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CheckoutError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_of(CheckoutError::InvalidRequest("Bad data".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::RestaurantNotFound {
                restaurant_id: "r-9".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CheckoutError::Unauthorized("no user".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(CheckoutError::session_failed("Your card was declined")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CheckoutError::Storage("pool timed out".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_carries_message() {
        let response = ApiError(CheckoutError::session_failed("Your card was declined"))
            .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Your card was declined");
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let response = ApiError(CheckoutError::Storage("password auth failed".into()))
            .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Something went wrong");
    }
}
