//! HTTP surface: storefront, cart and checkout, orders, and the admin console.

use std::sync::Arc;

use axum::{routing::get, Json, Router};

use crate::config::AppConfig;
use crate::infrastructure::repository::{CategoryRepository, OrderRepository, ProductRepository, UserRepository};
use crate::infrastructure::session::SessionStore;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod wizard;

#[derive(Clone)]
pub struct AppState {
    pub categories: CategoryRepository,
    pub products: ProductRepository,
    pub orders: OrderRepository,
    pub users: UserRepository,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: sqlx::PgPool, config: AppConfig) -> Self {
        Self {
            categories: CategoryRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone(), config.sku_max_attempts),
            orders: OrderRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            sessions: SessionStore::new(config.session_ttl),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "piste-shop"})) }))
        .merge(catalog::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(admin::routes())
        .merge(wizard::routes())
        .merge(auth::routes())
        .with_state(state)
}
