//! Order Aggregate
//!
//! Orders are written once, at checkout, and never change afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::cart::Purchasable;
use super::checkout::ShippingAddress;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Impact, Money, Sku};

/// Snapshot of a purchased line at the time of purchase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub item: Purchasable,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Sku,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub unit_impact: Decimal,
}

impl OrderItem {
    pub fn line_total(&self, currency: &str) -> Money { Money::new(self.unit_price, currency).multiply(self.quantity) }
    pub fn line_impact(&self) -> Impact { Impact::new(self.unit_impact).multiply(self.quantity) }
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    items: Vec<OrderItem>,
    total: Money,
    total_impact: Impact,
    shipping: ShippingAddress,
    card_last4: String,
    placed_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub name: String,
    pub sku: Sku,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Money,
    pub line_impact: Impact,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Invoice {
    pub order_id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub ship_to: ShippingAddress,
    pub card_last4: String,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Money,
    pub total_impact: Impact,
}

impl Order {
    pub fn place(
        user_id: Uuid, items: Vec<OrderItem>, shipping: ShippingAddress, card_last4: String, currency: &str,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        if items.iter().any(|i| i.quantity == 0) { return Err(OrderError::ZeroQuantity); }
        let id = Uuid::now_v7();
        let mut order = Self::restore(id, user_id, items, shipping, card_last4, currency, Utc::now());
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, user_id, total: order.total.amount(), items: order.items.len(),
        }));
        Ok(order)
    }

    pub fn restore(
        id: Uuid, user_id: Uuid, items: Vec<OrderItem>, shipping: ShippingAddress, card_last4: String,
        currency: &str, placed_at: DateTime<Utc>,
    ) -> Self {
        let total = items.iter().fold(Money::zero(currency), |acc, i| acc.add(&i.line_total(currency)).unwrap_or(acc));
        let total_impact = items.iter().fold(Impact::ZERO, |acc, i| acc.add(i.line_impact()));
        Self { id, user_id, items, total, total_impact, shipping, card_last4, placed_at, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn total(&self) -> &Money { &self.total }
    pub fn total_impact(&self) -> Impact { self.total_impact }
    pub fn shipping(&self) -> &ShippingAddress { &self.shipping }
    pub fn card_last4(&self) -> &str { &self.card_last4 }
    pub fn placed_at(&self) -> DateTime<Utc> { self.placed_at }

    /// Owners and admins may view an order.
    pub fn check_access(&self, viewer: Uuid, viewer_is_admin: bool) -> Result<(), OrderError> {
        if viewer == self.user_id || viewer_is_admin { Ok(()) } else { Err(OrderError::NotOwner) }
    }

    pub fn invoice(&self) -> Invoice {
        let currency = self.total.currency();
        Invoice {
            order_id: self.id,
            placed_at: self.placed_at,
            ship_to: self.shipping.clone(),
            card_last4: self.card_last4.clone(),
            lines: self
                .items
                .iter()
                .map(|i| InvoiceLine {
                    name: i.name.clone(),
                    sku: i.sku.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    line_total: i.line_total(currency),
                    line_impact: i.line_impact(),
                })
                .collect(),
            subtotal: self.total.clone(),
            total_impact: self.total_impact,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("an order needs at least one item")]
    NoItems,
    #[error("order lines need a quantity of at least 1")]
    ZeroQuantity,
    #[error("this order belongs to another customer")]
    NotOwner,
}
