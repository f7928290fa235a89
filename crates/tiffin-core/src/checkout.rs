//! # Checkout Service
//!
//! Turns a submitted cart into a provider-hosted payment session:
//!
//! 1. look up the restaurant and price the cart (no writes on failure)
//! 2. allocate the order id so it can ride along in session metadata
//! 3. create the provider session
//! 4. persist the order in `placed` state only once the session exists

use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::{CheckoutUrls, SessionRequest, SharedPaymentGateway};
use crate::order::{DeliveryDetails, NewOrder, Order, OrderId, OrderItem};
use crate::pricing::{build_line_items, items_total, CartItem, Pricing};
use crate::restaurant::RestaurantDirectory;
use crate::store::SharedOrderStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Create checkout session request (wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub restaurant_id: String,
    pub delivery_details: DeliveryDetails,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
}

/// Outcome of a successful checkout
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub session_id: String,
    pub checkout_url: String,
}

/// Orchestrates pricing, session creation and order persistence
#[derive(Clone)]
pub struct CheckoutService {
    restaurants: Arc<dyn RestaurantDirectory>,
    gateway: SharedPaymentGateway,
    orders: SharedOrderStore,
    pricing: Pricing,
    urls: CheckoutUrls,
}

impl CheckoutService {
    pub fn new(
        restaurants: Arc<dyn RestaurantDirectory>,
        gateway: SharedPaymentGateway,
        orders: SharedOrderStore,
        pricing: Pricing,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            restaurants,
            gateway,
            orders,
            pricing,
            urls,
        }
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    #[instrument(
        skip(self, request),
        fields(restaurant_id = %request.restaurant_id, items = request.cart_items.len())
    )]
    pub async fn create_checkout_session(
        &self,
        user_id: &str,
        request: CheckoutRequest,
    ) -> CheckoutResult<CheckoutOutcome> {
        if request.cart_items.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "Cart has no items".to_string(),
            ));
        }

        let restaurant = self
            .restaurants
            .find_restaurant(&request.restaurant_id)
            .await?
            .ok_or_else(|| CheckoutError::RestaurantNotFound {
                restaurant_id: request.restaurant_id.clone(),
            })?;

        let line_items = build_line_items(&request.cart_items, &restaurant, &self.pricing)?;
        let delivery_fee = self.pricing.to_provider_units(restaurant.delivery_price)?;
        let expected_total = items_total(&line_items)?
            .checked_add(delivery_fee)
            .ok_or_else(|| CheckoutError::InvalidPrice {
                message: "order total overflows with delivery fee".to_string(),
            })?;

        let cart_items = request
            .cart_items
            .iter()
            .zip(&line_items)
            .map(|(cart, line)| OrderItem::from_cart(cart, line.quantity))
            .collect();

        let order_id = OrderId::new();
        let session_request = SessionRequest {
            line_items,
            order_id,
            restaurant_id: restaurant.id.clone(),
            delivery_fee,
            currency: self.pricing.currency().to_string(),
            customer_email: Some(request.delivery_details.email.clone())
                .filter(|email| !email.is_empty()),
            success_url: self.urls.success_url(),
            cancel_url: self.urls.cancel_url(&restaurant.id),
        };

        info!(
            "Creating checkout: order={}, {} lines, total={}, delivery_fee={}",
            order_id,
            session_request.line_items.len(),
            expected_total,
            delivery_fee
        );

        let session = self
            .gateway
            .create_session(&session_request)
            .await
            .map_err(|e| {
                error!("Failed to create checkout session: {}", e);
                e
            })?;

        let new_order = NewOrder {
            id: order_id,
            user_id: user_id.to_string(),
            restaurant_id: restaurant.id,
            cart_items,
            delivery_details: request.delivery_details,
        };

        let order = self.orders.create(new_order).await.map_err(|e| {
            // the session exists but nothing will resolve its webhook
            error!(
                "Order persistence failed after session creation: order={}, session={}: {}",
                order_id, session.session_id, e
            );
            e
        })?;

        info!(
            "Order placed: order={}, items={}, session={}",
            order.id,
            order.item_count(),
            session.session_id
        );

        Ok(CheckoutOutcome {
            order,
            session_id: session.session_id,
            checkout_url: session.checkout_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::pricing::DEFAULT_PRICE_SCALE;
    use crate::store::{MemoryOrderStore, OrderStore};
    use crate::testing::{sample_catalog, FakeGateway};

    fn request(cart: Vec<CartItem>) -> CheckoutRequest {
        CheckoutRequest {
            restaurant_id: "r-1".into(),
            delivery_details: DeliveryDetails {
                email: "diner@example.com".into(),
                name: "Asha".into(),
                address_line1: "12 MG Road".into(),
                city: "Pune".into(),
            },
            cart_items: cart,
        }
    }

    fn service(gateway: Arc<FakeGateway>, store: MemoryOrderStore) -> CheckoutService {
        CheckoutService::new(
            Arc::new(sample_catalog()),
            gateway,
            Arc::new(store),
            Pricing::default(),
            CheckoutUrls::new("https://tiffincart.app"),
        )
    }

    #[tokio::test]
    async fn test_checkout_prices_and_persists() {
        let gateway = Arc::new(FakeGateway::new());
        let store = MemoryOrderStore::new();
        let service = service(gateway.clone(), store.clone());

        let outcome = service
            .create_checkout_session("user-1", request(vec![CartItem::new("A", "Paneer Tikka", "2")]))
            .await
            .unwrap();

        let sent = gateway.last_request().unwrap();
        assert_eq!(sent.line_items[0].unit_amount, 100 * DEFAULT_PRICE_SCALE);
        assert_eq!(sent.line_items[0].quantity, 2);
        assert_eq!(sent.delivery_fee, 20 * DEFAULT_PRICE_SCALE);
        assert_eq!(sent.order_id, outcome.order.id);
        assert_eq!(sent.restaurant_id, "r-1");
        assert_eq!(
            sent.cancel_url,
            "https://tiffincart.app/detail/r-1?cancelled=true"
        );

        let stored = store.find_by_id(outcome.order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Placed);
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.total_amount, None);
        assert_eq!(outcome.checkout_url, format!("https://pay.test/{}", stored.id));
    }

    #[tokio::test]
    async fn test_unknown_menu_item_persists_nothing() {
        let gateway = Arc::new(FakeGateway::new());
        let store = MemoryOrderStore::new();
        let service = service(gateway.clone(), store.clone());

        let err = service
            .create_checkout_session("user-1", request(vec![CartItem::new("ghost", "", "1")]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidCartItem { .. }));
        assert!(store.is_empty().await);
        assert!(gateway.last_request().is_none());
    }

    #[tokio::test]
    async fn test_unknown_restaurant() {
        let service = service(Arc::new(FakeGateway::new()), MemoryOrderStore::new());
        let mut req = request(vec![CartItem::new("A", "", "1")]);
        req.restaurant_id = "nowhere".into();

        assert!(matches!(
            service.create_checkout_session("user-1", req).await,
            Err(CheckoutError::RestaurantNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let service = service(Arc::new(FakeGateway::new()), MemoryOrderStore::new());

        assert!(matches!(
            service.create_checkout_session("user-1", request(vec![])).await,
            Err(CheckoutError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_session_failure_leaves_no_order() {
        let gateway = Arc::new(FakeGateway::failing("Your card was declined."));
        let store = MemoryOrderStore::new();
        let service = service(gateway, store.clone());

        let err = service
            .create_checkout_session("user-1", request(vec![CartItem::new("A", "", "1")]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::SessionCreationFailed { .. }));
        assert!(err.to_string().contains("Your card was declined."));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_oversized_cart_never_reaches_gateway() {
        let gateway = Arc::new(FakeGateway::new());
        let store = MemoryOrderStore::new();
        let service = service(gateway.clone(), store.clone());

        let max_quantity = u32::MAX.to_string();
        let cart = vec![CartItem::new("A", "", max_quantity.as_str()); 500_000];

        let err = service
            .create_checkout_session("user-1", request(cart))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidPrice { .. }));
        assert!(gateway.last_request().is_none());
        assert!(store.is_empty().await);
    }
}
