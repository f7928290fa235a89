//! # Restaurant Types
//!
//! Read-only restaurant and menu data used to price carts.
//! Restaurants are owned by the restaurant-management service; this crate
//! only looks them up through [`RestaurantDirectory`].

use crate::error::{CheckoutError, CheckoutResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A dish on a restaurant's menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Menu item identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Price in the currency's base unit (positive)
    pub price: i64,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
        }
    }
}

/// A restaurant with its authoritative menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    /// Restaurant identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// City the restaurant delivers in
    #[serde(default)]
    pub city: String,

    /// Flat delivery fee in the currency's base unit
    pub delivery_price: i64,

    /// Menu items
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

impl Restaurant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, delivery_price: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            city: String::new(),
            delivery_price,
            menu_items: Vec::new(),
        }
    }

    /// Builder: set city
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    /// Builder: add a menu item
    pub fn with_menu_item(mut self, item: MenuItem) -> Self {
        self.menu_items.push(item);
        self
    }

    /// Find a menu item by ID
    pub fn menu_item(&self, id: &str) -> Option<&MenuItem> {
        self.menu_items.iter().find(|m| m.id == id)
    }

    /// Delivery and menu prices must be positive
    pub fn validate(&self) -> CheckoutResult<()> {
        if self.delivery_price <= 0 {
            return Err(CheckoutError::Configuration(format!(
                "Restaurant {} has non-positive delivery_price {}",
                self.id, self.delivery_price
            )));
        }
        if let Some(item) = self.menu_items.iter().find(|m| m.price <= 0) {
            return Err(CheckoutError::Configuration(format!(
                "Menu item {} of restaurant {} has non-positive price {}",
                item.id, self.id, item.price
            )));
        }
        Ok(())
    }
}

/// Lookup seam to the restaurant-management subsystem.
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    /// Find a restaurant by ID. `Ok(None)` means it does not exist.
    async fn find_restaurant(&self, id: &str) -> CheckoutResult<Option<Restaurant>>;
}

/// Restaurant catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestaurantCatalog {
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
}

impl RestaurantCatalog {
    pub fn new() -> Self {
        Self {
            restaurants: Vec::new(),
        }
    }

    /// Add a restaurant to the catalog
    pub fn add(&mut self, restaurant: Restaurant) {
        self.restaurants.push(restaurant);
    }

    /// Builder: add a restaurant
    pub fn with_restaurant(mut self, restaurant: Restaurant) -> Self {
        self.add(restaurant);
        self
    }

    /// Find a restaurant by ID
    pub fn get(&self, id: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    /// Load and validate a catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> CheckoutResult<Self> {
        let catalog: Self = toml::from_str(toml_str).map_err(|e| {
            CheckoutError::Configuration(format!("Invalid restaurant catalog: {}", e))
        })?;
        for restaurant in &catalog.restaurants {
            restaurant.validate()?;
        }
        Ok(catalog)
    }
}

#[async_trait]
impl RestaurantDirectory for RestaurantCatalog {
    async fn find_restaurant(&self, id: &str) -> CheckoutResult<Option<Restaurant>> {
        Ok(self.get(id).cloned())
    }
}
