//! Admin console: categories, products and their variants, user roles.
//!
//! Every handler takes an [`AdminUser`], so non-admins get 403 before any
//! work is done.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::AdminUser;
use super::AppState;
use crate::domain::aggregates::{Category, Product, ProductDetail, ProductDetails, RoleChange, User};
use crate::domain::services::combinations::CombinationKey;
use crate::domain::services::pricing::PricingRules;
use crate::domain::services::reconciliation::{ReconcilePlan, VariantInput};
use crate::domain::services::structure::OptionInput;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/categories", post(create_category))
        .route("/admin/categories/seed", post(seed_categories))
        .route("/admin/categories/:id", put(update_category).delete(delete_category))
        .route("/admin/products", post(create_product))
        .route("/admin/products/:id", put(update_product).delete(delete_product))
        .route("/admin/products/:id/stock", put(update_stock))
        .route("/admin/products/:id/options", put(replace_options))
        .route("/admin/products/:id/variants", put(update_variants))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", axum::routing::delete(delete_user))
        .route("/admin/users/:id/promote", post(promote_user))
        .route("/admin/users/:id/demote", post(demote_user))
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sku_code: Option<String>,
}

async fn create_category(State(s): State<AppState>, _: AdminUser, Json(r): Json<CategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    let category = Category::new(&r.name, r.slug.as_deref(), r.parent_id, r.sku_code.as_deref())?;
    Ok((StatusCode::CREATED, Json(s.categories.create(category).await?)))
}

async fn update_category(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, Json(r): Json<CategoryRequest>) -> Result<Json<Category>> {
    let category = s.categories.update(id, &r.name, r.slug.as_deref(), r.parent_id, r.sku_code.as_deref()).await?;
    Ok(Json(category))
}

async fn delete_category(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn seed_categories(State(s): State<AppState>, _: AdminUser) -> Result<Json<serde_json::Value>> {
    let inserted = s.categories.seed_defaults().await?;
    Ok(Json(serde_json::json!({ "inserted": inserted })))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StockKeeping {
    pub price: Decimal,
    #[serde(default)]
    pub impact: Decimal,
    pub stock: i32,
}

/// A simple product. Variant parents are created through the wizard.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    pub details: ProductDetails,
    #[serde(flatten)]
    pub stock_keeping: StockKeeping,
}

async fn create_product(State(s): State<AppState>, _: AdminUser, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let StockKeeping { price, impact, stock } = r.stock_keeping;
    let product = s.products.create_simple(r.details, price, impact, stock).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, Json(details): Json<ProductDetails>) -> Result<Json<Product>> {
    Ok(Json(s.products.update_details(id, details).await?))
}

async fn update_stock(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, Json(r): Json<StockKeeping>) -> Result<Json<Product>> {
    Ok(Json(s.products.update_stock_keeping(id, r.price, r.impact, r.stock).await?))
}

async fn delete_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReplaceOptionsRequest {
    pub options: Vec<OptionInput>,
    #[serde(default)]
    pub rules: PricingRules,
}

/// Counts of what a reconciliation did, returned with the refreshed product.
#[derive(Debug, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub product: ProductDetail,
}

impl ReconcileSummary {
    fn new(plan: &ReconcilePlan, product: ProductDetail) -> Self {
        Self {
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            deleted: plan.to_delete.len(),
            unchanged: plan.unchanged.len(),
            product,
        }
    }
}

async fn replace_options(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<ReplaceOptionsRequest>,
) -> Result<Json<ReconcileSummary>> {
    let plan = s.products.replace_options(id, &r.options, &r.rules).await?;
    Ok(Json(ReconcileSummary::new(&plan, s.products.detail(id).await?)))
}

#[derive(Debug, Deserialize)]
pub struct VariantSubmission {
    pub value_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub fields: VariantInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVariantsRequest {
    pub variants: Vec<VariantSubmission>,
}

async fn update_variants(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateVariantsRequest>,
) -> Result<Json<ReconcileSummary>> {
    let submissions: Vec<(CombinationKey, VariantInput)> =
        r.variants.into_iter().map(|v| (v.value_ids.into_iter().collect(), v.fields)).collect();
    let plan = s.products.update_variants(id, submissions).await?;
    Ok(Json(ReconcileSummary::new(&plan, s.products.detail(id).await?)))
}

// =============================================================================
// Users
// =============================================================================

async fn list_users(State(s): State<AppState>, _: AdminUser) -> Result<Json<Vec<User>>> {
    Ok(Json(s.users.list().await?))
}

async fn promote_user(State(s): State<AppState>, AdminUser(actor): AdminUser, Path(id): Path<Uuid>) -> Result<Json<User>> {
    Ok(Json(s.users.change_role(&actor, id, RoleChange::Promote).await?))
}

async fn demote_user(State(s): State<AppState>, AdminUser(actor): AdminUser, Path(id): Path<Uuid>) -> Result<Json<User>> {
    Ok(Json(s.users.change_role(&actor, id, RoleChange::Demote).await?))
}

async fn delete_user(State(s): State<AppState>, AdminUser(actor): AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.users.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
