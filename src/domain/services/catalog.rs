//! Storefront listing: filtering and sorting by effective price or impact.

use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the product listing. For variant parents the effective
/// figures are the minimum across variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductListing {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_ref: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_variant_parent: bool,
    pub effective_price: Option<Decimal>,
    pub effective_impact: Option<Decimal>,
    pub total_stock: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    PriceAsc,
    PriceDesc,
    ImpactAsc,
    ImpactDesc,
}

#[derive(Clone, Debug, Default)]
pub struct ListingFilter {
    /// Category and all its descendants.
    pub categories: Option<HashSet<Uuid>>,
    pub query: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &ProductListing) -> bool {
        if let Some(categories) = &self.categories {
            if !listing.category_id.is_some_and(|c| categories.contains(&c)) {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                listing.name.to_lowercase().contains(&q) || listing.description.to_lowercase().contains(&q)
            }
            None => true,
        }
    }
}

/// Missing figures sort after present ones in both directions.
fn by_figure(a: Option<Decimal>, b: Option<Decimal>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_listings(listings: &mut [ProductListing], key: SortKey) {
    listings.sort_by(|a, b| {
        let primary = match key {
            SortKey::Name => Ordering::Equal,
            SortKey::PriceAsc => by_figure(a.effective_price, b.effective_price, false),
            SortKey::PriceDesc => by_figure(a.effective_price, b.effective_price, true),
            SortKey::ImpactAsc => by_figure(a.effective_impact, b.effective_impact, false),
            SortKey::ImpactDesc => by_figure(a.effective_impact, b.effective_impact, true),
        };
        primary.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

pub fn filter_and_sort(listings: Vec<ProductListing>, filter: &ListingFilter, key: SortKey) -> Vec<ProductListing> {
    let mut out: Vec<ProductListing> = listings.into_iter().filter(|l| filter.matches(l)).collect();
    sort_listings(&mut out, key);
    out
}
