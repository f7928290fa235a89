//! # Order Store
//!
//! The order lifecycle store is the only shared mutable resource in the
//! service. Transitions must be atomic conditional updates: a transition is
//! applied only while the order is still `placed`, so concurrent or repeated
//! webhook deliveries converge on one final state.

use crate::error::{CheckoutError, CheckoutResult};
use crate::order::{NewOrder, Order, OrderId, StatusChange};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order in `placed` state.
    async fn create(&self, order: NewOrder) -> CheckoutResult<Order>;

    /// Load an order, failing with `OrderNotFound` if it does not exist.
    async fn find_by_id(&self, id: OrderId) -> CheckoutResult<Order>;

    /// Move `placed → paid` recording the settled amount.
    ///
    /// Calling this on an order that is already `paid` (or `cancelled`) is
    /// not an error: the stored order is returned with `applied = false`.
    async fn mark_paid(&self, id: OrderId, amount: i64) -> CheckoutResult<StatusChange>;

    /// Move `placed → cancelled`. Idempotent like [`OrderStore::mark_paid`].
    async fn mark_cancelled(&self, id: OrderId) -> CheckoutResult<StatusChange>;

    /// All orders of a user, newest first.
    async fn find_all_by_user(&self, user_id: &str) -> CheckoutResult<Vec<Order>>;
}

/// Type alias for a shared order store (dynamic dispatch)
pub type SharedOrderStore = Arc<dyn OrderStore>;

/// In-process store. Each transition runs inside one write-lock section.
#[derive(Debug, Default, Clone)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    async fn transition<F>(&self, id: OrderId, apply: F) -> CheckoutResult<StatusChange>
    where
        F: FnOnce(&mut Order) -> bool + Send,
    {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or_else(|| not_found(id))?;
        let applied = apply(order);
        Ok(StatusChange {
            order: order.clone(),
            applied,
        })
    }
}

fn not_found(id: OrderId) -> CheckoutError {
    CheckoutError::OrderNotFound {
        order_id: id.to_string(),
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, new: NewOrder) -> CheckoutResult<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&new.id) {
            return Err(CheckoutError::Storage(format!(
                "order {} already exists",
                new.id
            )));
        }
        let order = Order::place(new, Utc::now());
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> CheckoutResult<Order> {
        self.orders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn mark_paid(&self, id: OrderId, amount: i64) -> CheckoutResult<StatusChange> {
        self.transition(id, |order| order.apply_paid(amount, Utc::now()))
            .await
    }

    async fn mark_cancelled(&self, id: OrderId) -> CheckoutResult<StatusChange> {
        self.transition(id, |order| order.apply_cancelled(Utc::now()))
            .await
    }

    async fn find_all_by_user(&self, user_id: &str) -> CheckoutResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }
}
