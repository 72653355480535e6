//! Storefront: product listing, product detail, category tree.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::{Category, ProductDetail};
use crate::domain::services::catalog::{filter_and_sort, ListingFilter, ProductListing, SortKey};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<Uuid>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
}

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<Vec<ProductListing>>> {
    let categories = match p.category {
        Some(id) => {
            let tree = s.categories.tree().await?;
            tree.get(id).ok_or(crate::ShopError::NotFound("category"))?;
            Some(tree.descendants(id))
        }
        None => None,
    };
    let filter = ListingFilter { categories, query: p.q };
    let listings = s.products.listings().await?;
    Ok(Json(filter_and_sort(listings, &filter, p.sort)))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProductDetail>> {
    Ok(Json(s.products.detail(id).await?))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.categories.list().await?))
}
