//! # Pricing
//!
//! Turns a submitted cart into priced line items against the restaurant's
//! authoritative menu. Pure: no I/O, no clock, no randomness.
//!
//! Every amount that crosses into the payment gateway goes through the same
//! [`Pricing::to_provider_units`], so item prices and the delivery fee always
//! share one scale factor.

use crate::error::{CheckoutError, CheckoutResult};
use crate::restaurant::Restaurant;
use serde::{Deserialize, Serialize};

/// Default factor between menu prices and provider minor units
pub const DEFAULT_PRICE_SCALE: i64 = 50;

/// Default ISO 4217 currency code sent to the provider
pub const DEFAULT_CURRENCY: &str = "inr";

/// Currency and scale factor used for every provider-bound amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    currency: String,
    scale: i64,
}

impl Pricing {
    /// Create a pricing config. The scale must be positive.
    pub fn new(currency: impl Into<String>, scale: i64) -> CheckoutResult<Self> {
        if scale <= 0 {
            return Err(CheckoutError::Configuration(format!(
                "price scale must be positive, got {}",
                scale
            )));
        }
        Ok(Self {
            currency: currency.into().to_lowercase(),
            scale,
        })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Convert a base-unit amount to provider minor units
    pub fn to_provider_units(&self, amount: i64) -> CheckoutResult<i64> {
        if amount < 0 {
            return Err(CheckoutError::InvalidPrice {
                message: format!("negative amount {}", amount),
            });
        }
        amount
            .checked_mul(self.scale)
            .ok_or_else(|| CheckoutError::InvalidPrice {
                message: format!("amount {} overflows at scale {}", amount, self.scale),
            })
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            scale: DEFAULT_PRICE_SCALE,
        }
    }
}

/// An item in the submitted cart (wire format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Menu item reference
    pub menu_item_id: String,

    /// Display name as shown in the client's cart
    #[serde(default)]
    pub name: String,

    /// Requested quantity, string-encoded
    pub quantity: String,
}

impl CartItem {
    pub fn new(
        menu_item_id: impl Into<String>,
        name: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            name: name.into(),
            quantity: quantity.into(),
        }
    }

    /// Parse the quantity as a positive integer
    pub fn parsed_quantity(&self) -> CheckoutResult<u32> {
        match self.quantity.trim().parse::<u32>() {
            Ok(q) if q > 0 => Ok(q),
            _ => Err(CheckoutError::InvalidQuantity {
                menu_item_id: self.menu_item_id.clone(),
                quantity: self.quantity.clone(),
            }),
        }
    }
}

/// A priced line item, ready for the payment gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Menu item ID
    pub menu_item_id: String,

    /// Menu item name (from the menu, not the client)
    pub name: String,

    /// Unit amount in provider minor units
    pub unit_amount: i64,

    /// Quantity
    pub quantity: u32,
}

impl LineItem {
    /// Total for this line in provider minor units
    pub fn total(&self) -> CheckoutResult<i64> {
        self.unit_amount
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| CheckoutError::InvalidPrice {
                message: format!("line total overflows for {}", self.menu_item_id),
            })
    }
}

/// Price every cart item against the restaurant's menu.
///
/// Fails fast on the first unknown menu item or bad quantity; no partial
/// result is returned. The cart total must stay representable too, so an
/// oversized cart is rejected here rather than at the provider.
pub fn build_line_items(
    cart: &[CartItem],
    restaurant: &Restaurant,
    pricing: &Pricing,
) -> CheckoutResult<Vec<LineItem>> {
    let items = cart
        .iter()
        .map(|cart_item| {
            let menu_item = restaurant
                .menu_item(&cart_item.menu_item_id)
                .ok_or_else(|| CheckoutError::InvalidCartItem {
                    menu_item_id: cart_item.menu_item_id.clone(),
                })?;

            let quantity = cart_item.parsed_quantity()?;
            let unit_amount = pricing.to_provider_units(menu_item.price)?;
            let item = LineItem {
                menu_item_id: menu_item.id.clone(),
                name: menu_item.name.clone(),
                unit_amount,
                quantity,
            };
            item.total()?;
            Ok(item)
        })
        .collect::<CheckoutResult<Vec<_>>>()?;

    items_total(&items)?;
    Ok(items)
}

/// Sum of all line totals in provider minor units
pub fn items_total(items: &[LineItem]) -> CheckoutResult<i64> {
    items.iter().try_fold(0i64, |sum, item| {
        sum.checked_add(item.total()?)
            .ok_or_else(|| CheckoutError::InvalidPrice {
                message: format!("cart total overflows after {}", item.menu_item_id),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::restaurant::MenuItem;

    fn menu() -> Restaurant {
        Restaurant::new("r-1", "Spice Route", 20)
            .with_menu_item(MenuItem::new("A", "Paneer Tikka", 100))
            .with_menu_item(MenuItem::new("B", "Masala Dosa", 60))
            .with_menu_item(MenuItem::new("C", "Lassi", 35))
    }

    #[test]
    fn test_single_item_priced_with_scale() {
        let pricing = Pricing::default();
        let cart = vec![CartItem::new("A", "Paneer Tikka", "2")];

        let items = build_line_items(&cart, &menu(), &pricing).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_amount, 100 * DEFAULT_PRICE_SCALE);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].name, "Paneer Tikka");
    }

    #[test]
    fn test_total_has_no_drift() {
        let menu = menu();
        for scale in [1, 7, 50, 100] {
            let pricing = Pricing::new("inr", scale).unwrap();
            let cart = vec![
                CartItem::new("A", "", "3"),
                CartItem::new("B", "", "1"),
                CartItem::new("C", "", "11"),
            ];

            let items = build_line_items(&cart, &menu, &pricing).unwrap();
            let expected = (100 * 3 + 60 + 35 * 11) * scale;

            assert_eq!(items_total(&items).unwrap(), expected);
        }
    }

    #[test]
    fn test_menu_name_wins_over_client_name() {
        let cart = vec![CartItem::new("B", "free food", "1")];
        let items = build_line_items(&cart, &menu(), &Pricing::default()).unwrap();
        assert_eq!(items[0].name, "Masala Dosa");
    }

    #[test]
    fn test_unknown_menu_item_aborts() {
        let cart = vec![CartItem::new("A", "", "1"), CartItem::new("nope", "", "1")];
        let err = build_line_items(&cart, &menu(), &Pricing::default()).unwrap_err();

        match err {
            CheckoutError::InvalidCartItem { menu_item_id } => assert_eq!(menu_item_id, "nope"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_quantities() {
        for bad in ["0", "-1", "two", "", "1.5"] {
            let cart = vec![CartItem::new("A", "", bad)];
            let err = build_line_items(&cart, &menu(), &Pricing::default()).unwrap_err();
            assert!(
                matches!(err, CheckoutError::InvalidQuantity { .. }),
                "quantity {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_quantity_whitespace_tolerated() {
        assert_eq!(CartItem::new("A", "", " 4 ").parsed_quantity().unwrap(), 4);
    }

    #[test]
    fn test_scale_must_be_positive() {
        assert!(matches!(
            Pricing::new("inr", 0),
            Err(CheckoutError::Configuration(_))
        ));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let pricing = Pricing::new("inr", i64::MAX).unwrap();
        assert!(matches!(
            pricing.to_provider_units(2),
            Err(CheckoutError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_oversized_cart_total_is_rejected() {
        let menu = Restaurant::new("r-1", "Spice Route", 20)
            .with_menu_item(MenuItem::new("A", "Paneer Tikka", 1000));
        let max_quantity = u32::MAX.to_string();

        // each line fits on its own, the sum does not
        let line = build_line_items(
            &[CartItem::new("A", "", max_quantity.as_str())],
            &menu,
            &Pricing::default(),
        )
        .unwrap();
        assert!(line[0].total().is_ok());

        let cart = vec![CartItem::new("A", "", max_quantity.as_str()); 50_000];
        let err = build_line_items(&cart, &menu, &Pricing::default()).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPrice { .. }));
    }

    #[test]
    fn test_items_total_checks_overflow() {
        let huge = LineItem {
            menu_item_id: "A".into(),
            name: "Paneer Tikka".into(),
            unit_amount: i64::MAX / 2,
            quantity: 1,
        };
        assert_eq!(items_total(&[huge.clone()]).unwrap(), i64::MAX / 2);
        assert!(matches!(
            items_total(&[huge.clone(), huge.clone(), huge]),
            Err(CheckoutError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_cart_item_wire_format() {
        let item: CartItem = serde_json::from_str(
            r#"{"menuItemId":"A","name":"Paneer Tikka","quantity":"2"}"#,
        )
        .unwrap();
        assert_eq!(item.menu_item_id, "A");
        assert_eq!(item.parsed_quantity().unwrap(), 2);
    }
}
