//! # Order Types
//!
//! The order aggregate and its status machine.
//!
//! ```text
//!            mark_paid
//!   placed ────────────▶ paid
//!      │
//!      │ mark_cancelled
//!      ▼
//!  cancelled
//! ```
//!
//! `paid` and `cancelled` are terminal.

use crate::pricing::CartItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout session created, awaiting payment
    Placed,
    /// Provider confirmed the payment
    Paid,
    /// Checkout abandoned or expired at the provider
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// `paid` and `cancelled` never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Placed)
    }

    /// Whether `self → next` is a forward transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Placed
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// Where and to whom the order is delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub email: String,
    pub name: String,
    pub address_line1: String,
    pub city: String,
}

/// A line of the order as submitted by the diner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
}

impl OrderItem {
    /// Build from a cart item whose quantity was already validated
    pub fn from_cart(item: &CartItem, quantity: u32) -> Self {
        Self {
            menu_item_id: item.menu_item_id.clone(),
            name: item.name.clone(),
            quantity,
        }
    }
}

/// Everything needed to persist an order except its lifecycle fields
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: String,
    pub restaurant_id: String,
    pub cart_items: Vec<OrderItem>,
    pub delivery_details: DeliveryDetails,
}

/// A stored order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub restaurant_id: String,
    pub cart_items: Vec<OrderItem>,
    pub delivery_details: DeliveryDetails,

    /// Settled amount in provider minor units; only set once `paid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,

    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a new order in `placed` state
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            user_id: new.user_id,
            restaurant_id: new.restaurant_id,
            cart_items: new.cart_items,
            delivery_details: new.delivery_details,
            total_amount: None,
            status: OrderStatus::Placed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `placed → paid`. Returns false if the order was not `placed`.
    pub fn apply_paid(&mut self, amount: i64, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(OrderStatus::Paid) {
            return false;
        }
        self.status = OrderStatus::Paid;
        self.total_amount = Some(amount);
        self.updated_at = now;
        true
    }

    /// Apply `placed → cancelled`. Returns false if the order was not `placed`.
    pub fn apply_cancelled(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        true
    }

    pub fn item_count(&self) -> u64 {
        self.cart_items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Result of a status transition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// The order after the request
    pub order: Order,
    /// False when the order was already past `placed` and nothing changed
    pub applied: bool,
}
