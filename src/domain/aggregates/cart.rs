//! Cart Aggregate
//!
//! The cart lives in the visitor's session. Quantities are bounded by the
//! stock seen when a line is added or changed; the final check happens
//! again, atomically, when the order is placed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{Impact, Money, Quantity, Sku};

/// What a cart line points at: a variant, or a product sold as itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Purchasable {
    Variant(Uuid),
    Product(Uuid),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub item: Purchasable,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Sku,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub unit_impact: Impact,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
    pub fn line_impact(&self) -> Impact { self.unit_impact.multiply(self.quantity.value()) }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    subtotal: Money,
    total_impact: Impact,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self {
            items: vec![], subtotal: Money::zero(currency), total_impact: Impact::ZERO,
            currency: currency.to_string(), updated_at: Utc::now(),
        }
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn total_impact(&self) -> Impact { self.total_impact }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity.value()).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn quantity_of(&self, item: Purchasable) -> u32 {
        self.items.iter().find(|i| i.item == item).map_or(0, |i| i.quantity.value())
    }

    /// Adds `item`, merging with an existing line. The merged quantity must
    /// fit in `stock`.
    pub fn add_item(&mut self, item: CartItem, stock: i32) -> Result<(), CartError> {
        if item.quantity.is_zero() { return Err(CartError::InvalidQuantity); }
        if item.unit_price.currency() != self.currency {
            return Err(CartError::Currency(item.unit_price.currency().to_string()));
        }
        let wanted = item.quantity.add(self.quantity_of(item.item));
        if !wanted.fits_in(stock) { return Err(CartError::InsufficientStock { available: stock.max(0) }); }

        if let Some(existing) = self.items.iter_mut().find(|i| i.item == item.item) {
            existing.quantity = wanted;
            existing.unit_price = item.unit_price;
            existing.unit_impact = item.unit_impact;
        } else {
            self.items.push(item);
        }
        self.recalculate();
        Ok(())
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, item: Purchasable, quantity: u32, stock: i32) -> Result<(), CartError> {
        let line = self.items.iter_mut().find(|i| i.item == item).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.retain(|i| i.item != item);
        } else {
            let quantity = Quantity::new(quantity);
            if !quantity.fits_in(stock) { return Err(CartError::InsufficientStock { available: stock.max(0) }); }
            line.quantity = quantity;
        }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, item: Purchasable) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.item != item);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        self.total_impact = self.items.iter().fold(Impact::ZERO, |acc, i| acc.add(i.line_impact()));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Only {available} items left in stock!")]
    InsufficientStock { available: i32 },
    #[error("cart is priced in a different currency than {0}")]
    Currency(String),
}
