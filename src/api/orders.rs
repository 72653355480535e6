use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::auth::CurrentUser;
use super::AppState;
use crate::domain::aggregates::{Invoice, Order};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/invoice", get(get_invoice))
}

async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_for_user(user.id).await?))
}

async fn load_visible(s: &AppState, user: &crate::domain::aggregates::User, id: Uuid) -> Result<Order> {
    let order = s.orders.get(id).await?;
    order.check_access(user.id, user.is_admin)?;
    Ok(order)
}

async fn get_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(load_visible(&s, &user, id).await?))
}

async fn get_invoice(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Invoice>> {
    Ok(Json(load_visible(&s, &user, id).await?.invoice()))
}
