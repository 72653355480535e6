//! Piste Shop
//!
//! Storefront and admin console for a fencing equipment retailer.
//!
//! ## Features
//! - Category tree with per-category SKU codes
//! - Simple products and variant parents (Size × Colour × Hand ...)
//! - Rule-based default pricing for every variant combination
//! - Variant reconciliation that keeps ids and SKUs across option edits
//! - Session cart, three step checkout, immutable orders and invoices

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;

use domain::aggregates::{CartError, CategoryError, CheckoutError, OrderError, ProductError, UserError, WizardError};
use domain::services::combinations::VariantError;
use domain::services::pricing::PricingError;
use domain::value_objects::SkuError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Only {available} items left in stock!")]
    InsufficientStock { available: i32 },

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ShopError>;

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::RowNotFound) {
            return ShopError::NotFound("record");
        }
        let code = match &e {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };
        match code.as_deref() {
            Some("23505") => ShopError::Conflict("that record already exists, please try again".into()),
            Some("23503") => ShopError::Conflict("that record is still in use".into()),
            _ => ShopError::Database(e),
        }
    }
}

impl From<CartError> for ShopError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InsufficientStock { available } => ShopError::InsufficientStock { available },
            CartError::ItemNotFound => ShopError::NotFound("cart item"),
            other => ShopError::Validation(other.to_string()),
        }
    }
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NotOwner => ShopError::Forbidden(e.to_string()),
            other => ShopError::Validation(other.to_string()),
        }
    }
}

impl From<UserError> for ShopError {
    fn from(e: UserError) -> Self { ShopError::Forbidden(e.to_string()) }
}

impl From<CategoryError> for ShopError {
    fn from(e: CategoryError) -> Self {
        match e {
            CategoryError::HasChildren(_) | CategoryError::HasProducts(_) => ShopError::Conflict(e.to_string()),
            other => ShopError::Validation(other.to_string()),
        }
    }
}

impl From<SkuError> for ShopError {
    fn from(e: SkuError) -> Self {
        match e {
            SkuError::Exhausted(_) => ShopError::Conflict(e.to_string()),
            other => ShopError::Validation(other.to_string()),
        }
    }
}

macro_rules! validation_errors {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ShopError {
            fn from(e: $ty) -> Self { ShopError::Validation(e.to_string()) }
        })*
    };
}

validation_errors!(CheckoutError, ProductError, VariantError, PricingError, WizardError, validator::ValidationErrors);

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = match &self {
            ShopError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::InsufficientStock { .. } | ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match &self {
            ShopError::Database(e) => {
                tracing::error!(error = %e, "request failed");
                serde_json::json!({ "error": "Something went wrong, please try again" })
            }
            ShopError::InsufficientStock { available } => {
                serde_json::json!({ "error": self.to_string(), "available": available })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
