//! # tiffin-store
//!
//! PostgreSQL implementation of `tiffin_core::OrderStore`.
//!
//! Status transitions are single conditional `UPDATE ... WHERE status =
//! 'placed'` statements, so concurrent webhook deliveries racing on the
//! same order (even from different processes) apply at most once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use tiffin_core::{
    CheckoutError, CheckoutResult, DeliveryDetails, NewOrder, Order, OrderId, OrderItem,
    OrderStatus, OrderStore, StatusChange,
};
use tracing::{debug, info};
use uuid::Uuid;

const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_orders.sql",
    include_str!("../migrations/0001_orders.sql"),
)];

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, cart_items, delivery_details, \
                             total_amount, status, created_at, updated_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt order row {id}: {message}")]
    Corrupt { id: Uuid, message: String },
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        CheckoutError::Storage(err.to_string())
    }
}

/// Create a connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the bundled schema. Every statement is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    for (name, sql) in MIGRATIONS {
        // prepared statements cannot hold multiple commands
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            sqlx::query(stmt).execute(pool).await?;
        }
        debug!("Applied migration {}", name);
    }
    Ok(())
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    restaurant_id: String,
    cart_items: Json<Vec<OrderItem>>,
    delivery_details: Json<DeliveryDetails>,
    total_amount: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row.status.parse().map_err(|message| StoreError::Corrupt {
            id: row.id,
            message,
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            user_id: row.user_id,
            restaurant_id: row.restaurant_id,
            cart_items: row.cart_items.0,
            delivery_details: row.delivery_details.0,
            total_amount: row.total_amount,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Order store backed by a `orders` table
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        info!("Order store connected");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    /// Settle a conditional transition; fall back to a read when it did not apply.
    async fn settle(&self, id: OrderId, updated: Option<OrderRow>) -> CheckoutResult<StatusChange> {
        if let Some(row) = updated {
            return Ok(StatusChange {
                order: Order::try_from(row)?,
                applied: true,
            });
        }

        let order = self.fetch(id).await?.ok_or_else(|| not_found(id))?;
        Ok(StatusChange {
            order,
            applied: false,
        })
    }
}

fn not_found(id: OrderId) -> CheckoutError {
    CheckoutError::OrderNotFound {
        order_id: id.to_string(),
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, new: NewOrder) -> CheckoutResult<Order> {
        let now = Utc::now();
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (id, user_id, restaurant_id, cart_items, delivery_details, \
             total_amount, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $7) RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(new.id.as_uuid())
        .bind(&new.user_id)
        .bind(&new.restaurant_id)
        .bind(Json(&new.cart_items))
        .bind(Json(&new.delivery_details))
        .bind(OrderStatus::Placed.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(Order::try_from(row)?)
    }

    async fn find_by_id(&self, id: OrderId) -> CheckoutResult<Order> {
        self.fetch(id).await?.ok_or_else(|| not_found(id))
    }

    async fn mark_paid(&self, id: OrderId, amount: i64) -> CheckoutResult<StatusChange> {
        let sql = format!(
            "UPDATE orders SET status = 'paid', total_amount = $2, updated_at = now() \
             WHERE id = $1 AND status = 'placed' RETURNING {}",
            ORDER_COLUMNS
        );
        let updated: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        self.settle(id, updated).await
    }

    async fn mark_cancelled(&self, id: OrderId) -> CheckoutResult<StatusChange> {
        let sql = format!(
            "UPDATE orders SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status = 'placed' RETURNING {}",
            ORDER_COLUMNS
        );
        let updated: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        self.settle(id, updated).await
    }

    async fn find_all_by_user(&self, user_id: &str) -> CheckoutResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.into_iter()
            .map(|row| Order::try_from(row).map_err(CheckoutError::from))
            .collect()
    }
}
