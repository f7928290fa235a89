//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the checkout service, webhook reconciler, restaurant directory and
//! order store, all built once at startup.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tiffin_core::{
    CheckoutService, CheckoutUrls, MemoryOrderStore, Pricing, RestaurantCatalog,
    RestaurantDirectory, SharedOrderStore, SharedPaymentGateway, WebhookReconciler,
};
use tiffin_store::PgOrderStore;
use tiffin_stripe::StripeCheckoutGateway;
use tracing::{info, warn};

const DEFAULT_RESTAURANTS_PATH: &str = "config/restaurants.toml";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Frontend origin used for redirect URLs and CORS
    pub frontend_url: String,
    /// Postgres connection string; in-memory orders when unset
    pub database_url: Option<String>,
    /// Restaurant catalog file
    pub restaurants_path: String,
    /// Multiplier from menu prices to provider minor units
    pub price_scale: i64,
    /// ISO currency code sent to the provider
    pub currency: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match get("PORT") {
            Some(port) => port.parse().with_context(|| format!("Invalid PORT: {}", port))?,
            None => 8080,
        };

        let price_scale = match get("PRICE_SCALE") {
            Some(scale) => scale
                .parse()
                .with_context(|| format!("Invalid PRICE_SCALE: {}", scale))?,
            None => tiffin_core::pricing::DEFAULT_PRICE_SCALE,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            database_url: get("DATABASE_URL").filter(|url| !url.is_empty()),
            restaurants_path: get("RESTAURANTS_PATH")
                .unwrap_or_else(|| DEFAULT_RESTAURANTS_PATH.to_string()),
            price_scale,
            currency: get("CURRENCY")
                .unwrap_or_else(|| tiffin_core::pricing::DEFAULT_CURRENCY.to_string()),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn pricing(&self) -> anyhow::Result<Pricing> {
        Ok(Pricing::new(self.currency.to_lowercase(), self.price_scale)?)
    }

    pub fn urls(&self) -> CheckoutUrls {
        CheckoutUrls::new(&self.frontend_url)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub reconciler: WebhookReconciler,
    pub restaurants: Arc<RestaurantCatalog>,
    pub orders: SharedOrderStore,
    pub config: AppConfig,
}

impl AppState {
    /// Wire the services around an already built gateway and store
    pub fn new(
        config: AppConfig,
        restaurants: RestaurantCatalog,
        gateway: SharedPaymentGateway,
        orders: SharedOrderStore,
    ) -> anyhow::Result<Self> {
        let restaurants = Arc::new(restaurants);
        let directory: Arc<dyn RestaurantDirectory> = restaurants.clone();

        let checkout = CheckoutService::new(
            directory,
            gateway.clone(),
            orders.clone(),
            config.pricing()?,
            config.urls(),
        );
        let reconciler = WebhookReconciler::new(gateway, orders.clone());

        Ok(Self {
            checkout,
            reconciler,
            restaurants,
            orders,
            config,
        })
    }

    /// Build everything from the environment: Stripe, the catalog and the store
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let restaurants = load_restaurant_catalog(&config.restaurants_path)?;

        let gateway = StripeCheckoutGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let orders: SharedOrderStore = match &config.database_url {
            Some(url) => Arc::new(
                PgOrderStore::connect(url)
                    .await
                    .context("Failed to connect order store")?,
            ),
            None => {
                warn!("DATABASE_URL not set, orders are kept in memory");
                Arc::new(MemoryOrderStore::new())
            }
        };

        Self::new(config, restaurants, Arc::new(gateway), orders)
    }
}

/// Load the restaurant catalog from a TOML file
pub fn load_restaurant_catalog(path: &str) -> anyhow::Result<RestaurantCatalog> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let catalog = RestaurantCatalog::from_toml(&content)
                .with_context(|| format!("Failed to parse {}", path))?;
            info!("Loaded {} restaurants from {}", catalog.len(), path);
            Ok(catalog)
        }
        Err(e) => {
            warn!("No restaurant catalog at {} ({}), using empty catalog", path, e);
            Ok(RestaurantCatalog::new())
        }
    }
}
