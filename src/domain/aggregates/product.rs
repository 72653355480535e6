//! Product Aggregate
//!
//! A product is either sold as itself ([`ProductKind::Simple`], carrying its
//! own SKU, price, impact and stock) or is a variant parent whose purchasable
//! units are [`ProductVariant`]s, one per combination of option values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::services::combinations::{Axis, CombinationKey};
use crate::domain::value_objects::{round2, Sku};

pub const NAME_MAX_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductKind {
    Simple { sku: Sku, price: Decimal, impact: Decimal, stock: i32 },
    VariantParent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType { Foil, Epee, Sabre }

/// Category specific attributes, stored as one structured payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryAttributes {
    Weapon { weapon: WeaponType, electric: bool },
    /// Newton rating of protective fabric: 350, 800 or 1600.
    Protective { newton_rating: Option<u16> },
    Apparel,
    Footwear,
}

impl CategoryAttributes {
    pub fn validate(&self) -> Result<(), ProductError> {
        match self {
            CategoryAttributes::Protective { newton_rating: Some(n) } if ![350, 800, 1600].contains(n) => {
                Err(ProductError::InvalidAttributes(format!("unsupported newton rating {n}")))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    id: Uuid,
    name: String,
    description: String,
    image_ref: Option<String>,
    category_id: Option<Uuid>,
    kind: ProductKind,
    attributes: Option<CategoryAttributes>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Fields shared by both product kinds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_ref: Option<String>,
    pub category_id: Option<Uuid>,
    pub attributes: Option<CategoryAttributes>,
}

impl ProductDetails {
    pub fn validate(&self) -> Result<(), ProductError> {
        let name = self.name.trim();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if name.chars().count() > NAME_MAX_LEN { return Err(ProductError::NameTooLong); }
        if let Some(attributes) = &self.attributes { attributes.validate()?; }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct VariantValue {
    pub id: Uuid,
    pub option_id: Uuid,
    pub value: String,
    pub position: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantOption {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub position: i32,
    pub values: Vec<VariantValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: Sku,
    pub price: Decimal,
    pub impact: Decimal,
    pub stock: i32,
    pub value_ids: Vec<Uuid>,
}

impl ProductVariant {
    pub fn key(&self) -> CombinationKey { self.value_ids.iter().copied().collect() }
}

impl PartialEq for VariantValue {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}
impl Eq for VariantValue {}

/// A product with its options and variants, as shown on the detail page.
#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub options: Vec<VariantOption>,
    pub variants: Vec<ProductVariant>,
}

impl ProductDetail {
    pub fn axes(&self) -> Vec<Axis<VariantValue>> {
        self.options.iter().map(|o| Axis::new(o.name.clone(), o.values.clone())).collect()
    }

    /// "Medium / Right" style label for a variant.
    pub fn variant_title(&self, variant: &ProductVariant) -> String {
        let mut labels = Vec::with_capacity(self.options.len());
        for option in &self.options {
            if let Some(value) = option.values.iter().find(|v| variant.value_ids.contains(&v.id)) {
                labels.push(value.value.as_str());
            }
        }
        labels.join(" / ")
    }
}

impl Product {
    pub fn create_simple(details: ProductDetails, sku: Sku, price: Decimal, impact: Decimal, stock: i32) -> Result<Self, ProductError> {
        details.validate()?;
        if price < Decimal::ZERO || impact < Decimal::ZERO { return Err(ProductError::NegativePrice); }
        if stock < 0 { return Err(ProductError::NegativeStock); }
        let kind = ProductKind::Simple { sku, price: round2(price), impact: round2(impact), stock };
        Ok(Self::create(details, kind))
    }

    pub fn create_variant_parent(details: ProductDetails) -> Result<Self, ProductError> {
        details.validate()?;
        Ok(Self::create(details, ProductKind::VariantParent))
    }

    fn create(details: ProductDetails, kind: ProductKind) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut product = Self {
            id, name: details.name.trim().to_string(), description: details.description, image_ref: details.image_ref,
            category_id: details.category_id, kind, attributes: details.attributes,
            created_at: now, updated_at: now, events: vec![],
        };
        let variant_parent = product.is_variant_parent();
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, name: product.name.clone(), variant_parent }));
        product
    }

    /// Rebuilds a product from storage without raising events.
    pub fn restore(
        id: Uuid, details: ProductDetails, kind: ProductKind, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, name: details.name, description: details.description, image_ref: details.image_ref,
            category_id: details.category_id, kind, attributes: details.attributes,
            created_at, updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn image_ref(&self) -> Option<&str> { self.image_ref.as_deref() }
    pub fn category_id(&self) -> Option<Uuid> { self.category_id }
    pub fn kind(&self) -> &ProductKind { &self.kind }
    pub fn attributes(&self) -> Option<&CategoryAttributes> { self.attributes.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_variant_parent(&self) -> bool { matches!(self.kind, ProductKind::VariantParent) }

    pub fn update_details(&mut self, details: ProductDetails) -> Result<(), ProductError> {
        details.validate()?;
        self.name = details.name.trim().to_string();
        self.description = details.description;
        self.image_ref = details.image_ref;
        self.category_id = details.category_id;
        self.attributes = details.attributes;
        self.touch();
        Ok(())
    }

    /// Replaces price, impact and stock of a simple product. The SKU is kept.
    pub fn update_stock_keeping(&mut self, price: Decimal, impact: Decimal, stock: i32) -> Result<(), ProductError> {
        let ProductKind::Simple { sku, .. } = &self.kind else { return Err(ProductError::NotSimple) };
        if price < Decimal::ZERO || impact < Decimal::ZERO { return Err(ProductError::NegativePrice); }
        if stock < 0 { return Err(ProductError::NegativeStock); }
        self.kind = ProductKind::Simple { sku: sku.clone(), price: round2(price), impact: round2(impact), stock };
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("product name must be at most {NAME_MAX_LEN} characters")]
    NameTooLong,
    #[error("price and impact must not be negative")]
    NegativePrice,
    #[error("stock must not be negative")]
    NegativeStock,
    #[error("product has no variants")]
    NotVariantParent,
    #[error("product is sold through its variants")]
    NotSimple,
    #[error("invalid attributes: {0}")]
    InvalidAttributes(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str) -> ProductDetails {
        ProductDetails { name: name.into(), description: "Wrist-length".into(), ..Default::default() }
    }

    #[test]
    fn test_product_create() {
        let mut p = Product::create_simple(details(" Fencing Glove "), Sku::new("GLV-FG-AB12").unwrap(), Decimal::new(2499, 2), Decimal::new(12, 1), 10).unwrap();
        assert_eq!(p.name(), "Fencing Glove");
        assert!(!p.is_variant_parent());
        let events = p.take_events();
        assert!(matches!(events.as_slice(), [DomainEvent::Product(ProductEvent::Created { variant_parent: false, .. })]));
        assert!(p.take_events().is_empty());
    }

    #[test]
    fn test_product_validation() {
        let sku = Sku::new("GLV-FG-AB12").unwrap();
        assert_eq!(Product::create_variant_parent(details("  ")).unwrap_err(), ProductError::MissingName);
        assert_eq!(Product::create_simple(details("Glove"), sku.clone(), Decimal::NEGATIVE_ONE, Decimal::ZERO, 1).unwrap_err(), ProductError::NegativePrice);
        assert_eq!(Product::create_simple(details("Glove"), sku, Decimal::ONE, Decimal::ZERO, -1).unwrap_err(), ProductError::NegativeStock);
        let bad = ProductDetails { attributes: Some(CategoryAttributes::Protective { newton_rating: Some(500) }), ..details("Jacket") };
        assert!(matches!(Product::create_variant_parent(bad), Err(ProductError::InvalidAttributes(_))));
    }

    #[test]
    fn test_stock_keeping_only_for_simple_products() {
        let mut parent = Product::create_variant_parent(details("Jacket")).unwrap();
        assert_eq!(parent.update_stock_keeping(Decimal::ONE, Decimal::ONE, 1), Err(ProductError::NotSimple));
        let mut simple = Product::create_simple(details("Tape"), Sku::new("TAP-TAP-0000").unwrap(), Decimal::ONE, Decimal::ZERO, 3).unwrap();
        simple.update_stock_keeping(Decimal::new(450, 2), Decimal::ZERO, 8).unwrap();
        assert!(matches!(simple.kind(), ProductKind::Simple { stock: 8, sku, .. } if sku.as_str() == "TAP-TAP-0000"));
    }

    #[test]
    fn test_variant_title_follows_option_order() {
        let product = Product::create_variant_parent(details("Glove")).unwrap();
        let size_id = Uuid::now_v7();
        let hand_id = Uuid::now_v7();
        let m = VariantValue { id: Uuid::now_v7(), option_id: size_id, value: "Medium".into(), position: 0 };
        let r = VariantValue { id: Uuid::now_v7(), option_id: hand_id, value: "Right".into(), position: 0 };
        let detail = ProductDetail {
            options: vec![
                VariantOption { id: size_id, product_id: product.id(), name: "Size".into(), position: 0, values: vec![m.clone()] },
                VariantOption { id: hand_id, product_id: product.id(), name: "Hand".into(), position: 1, values: vec![r.clone()] },
            ],
            variants: vec![ProductVariant { id: Uuid::now_v7(), product_id: product.id(), sku: Sku::new("GLV-G-M-R-0000").unwrap(), price: Decimal::ONE, impact: Decimal::ZERO, stock: 1, value_ids: vec![r.id, m.id] }],
            product,
        };
        assert_eq!(detail.variant_title(&detail.variants[0]), "Medium / Right");
        assert_eq!(detail.axes()[1].option, "Hand");
    }
}
