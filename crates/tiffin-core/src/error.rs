//! # Checkout Error Types
//!
//! Typed error handling for the checkout and reconciliation flow.
//! Every operation in this crate returns `Result<T, CheckoutError>`.

use thiserror::Error;

/// Core error type for checkout, storage and webhook operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or incomplete request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The caller did not present a user identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Restaurant referenced by the cart does not exist
    #[error("Restaurant not found: {restaurant_id}")]
    RestaurantNotFound { restaurant_id: String },

    /// Cart references a menu item the restaurant does not serve
    #[error("Menu item not found: {menu_item_id}")]
    InvalidCartItem { menu_item_id: String },

    /// Quantity is not a positive integer
    #[error("Invalid quantity '{quantity}' for menu item {menu_item_id}")]
    InvalidQuantity {
        menu_item_id: String,
        quantity: String,
    },

    /// Amount could not be represented in provider units
    #[error("Invalid price: {message}")]
    InvalidPrice { message: String },

    /// Payment provider refused or failed to create the session
    #[error("Checkout session creation failed: {message}")]
    SessionCreationFailed { message: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Verified webhook body is not a provider event envelope
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// No order with the given id
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Order store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CheckoutError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::InvalidRequest(_) => 400,
            CheckoutError::Unauthorized(_) => 401,
            CheckoutError::RestaurantNotFound { .. } => 404,
            CheckoutError::InvalidCartItem { .. } => 400,
            CheckoutError::InvalidQuantity { .. } => 400,
            CheckoutError::InvalidPrice { .. } => 400,
            CheckoutError::SessionCreationFailed { .. } => 500,
            CheckoutError::WebhookVerificationFailed(_) => 400,
            CheckoutError::WebhookParseError(_) => 400,
            CheckoutError::OrderNotFound { .. } => 404,
            CheckoutError::Storage(_) => 500,
        }
    }

    /// Returns true for faults caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Shorthand for `SessionCreationFailed`
    pub fn session_failed(message: impl Into<String>) -> Self {
        CheckoutError::SessionCreationFailed {
            message: message.into(),
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
