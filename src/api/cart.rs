//! Session cart and the three step checkout.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::AppState;
use crate::domain::aggregates::{Cart, CartItem, Checkout, CheckoutError, Order, PaymentForm, Purchasable, ShippingAddress};
use crate::domain::value_objects::{Impact, Money, Quantity, Sku};
use crate::infrastructure::repository::Purchase;
use crate::{Result, ShopError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart/:session", get(get_cart).delete(clear_cart))
        .route("/cart/:session/items", post(add_item).put(update_item).delete(remove_item))
        .route("/checkout/:session", get(get_checkout).post(start_checkout))
        .route("/checkout/:session/shipping", post(submit_shipping))
        .route("/checkout/:session/payment", post(submit_payment))
        .route("/checkout/:session/back", post(checkout_back))
        .route("/checkout/:session/place", post(place_order))
}

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub item: Purchasable,
    pub quantity: u32,
}

fn cart_item(item: Purchasable, purchase: Purchase, quantity: u32, currency: &str) -> Result<CartItem> {
    Ok(CartItem {
        item,
        product_id: purchase.product_id,
        name: purchase.name,
        sku: Sku::new(purchase.sku)?,
        quantity: Quantity::new(quantity),
        unit_price: Money::new(purchase.price, currency),
        unit_impact: Impact::new(purchase.impact),
    })
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<Cart> {
    let cart = s.sessions.get(&session).await.and_then(|d| d.cart);
    Json(cart.unwrap_or_else(|| Cart::new(&s.config.currency)))
}

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CartLineRequest>) -> Result<Json<Cart>> {
    let purchase = s.products.purchasable(r.item).await?;
    let stock = purchase.stock;
    let line = cart_item(r.item, purchase, r.quantity, &s.config.currency)?;
    let currency = s.config.currency.clone();
    let cart = s
        .sessions
        .update(&session, |data| {
            let cart = data.cart.get_or_insert_with(|| Cart::new(&currency));
            cart.add_item(line, stock).map(|()| cart.clone())
        })
        .await?;
    tracing::debug!(session = %session, item = ?r.item, quantity = r.quantity, "added to cart");
    Ok(Json(cart))
}

/// Sets the quantity of a line. Zero removes it.
async fn update_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CartLineRequest>) -> Result<Json<Cart>> {
    let stock = if r.quantity == 0 { 0 } else { s.products.purchasable(r.item).await?.stock };
    let cart = s
        .sessions
        .update(&session, |data| {
            let cart = data.cart.as_mut().ok_or(ShopError::NotFound("cart item"))?;
            cart.update_quantity(r.item, r.quantity, stock)?;
            Ok::<_, ShopError>(cart.clone())
        })
        .await?;
    Ok(Json(cart))
}

async fn remove_item(State(s): State<AppState>, Path(session): Path<String>, Json(item): Json<Purchasable>) -> Result<Json<Cart>> {
    let cart = s
        .sessions
        .update(&session, |data| {
            let cart = data.cart.as_mut().ok_or(ShopError::NotFound("cart item"))?;
            cart.remove_item(item)?;
            Ok::<_, ShopError>(cart.clone())
        })
        .await?;
    Ok(Json(cart))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    s.sessions
        .update(&session, |data| {
            data.cart = None;
            data.checkout = None;
        })
        .await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub checkout: Checkout,
    pub cart: Cart,
}

async fn get_checkout(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CheckoutView>> {
    let data = s.sessions.get(&session).await.unwrap_or_default();
    let checkout = data.checkout.ok_or(ShopError::NotFound("checkout"))?;
    let cart = data.cart.unwrap_or_else(|| Cart::new(&s.config.currency));
    Ok(Json(CheckoutView { checkout, cart }))
}

async fn start_checkout(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<Checkout>> {
    let checkout = s
        .sessions
        .update(&session, |data| {
            let empty = Cart::new("");
            let checkout = Checkout::start(data.cart.as_ref().unwrap_or(&empty))?;
            data.checkout = Some(checkout.clone());
            Ok::<_, CheckoutError>(checkout)
        })
        .await?;
    Ok(Json(checkout))
}

/// Runs `f` on the session's checkout and returns the new state.
async fn with_checkout(
    s: &AppState,
    session: &str,
    f: impl FnOnce(&mut Checkout) -> std::result::Result<(), CheckoutError>,
) -> Result<Json<Checkout>> {
    let checkout = s
        .sessions
        .update(session, |data| {
            let checkout = data.checkout.as_mut().ok_or(ShopError::NotFound("checkout"))?;
            f(checkout)?;
            Ok::<_, ShopError>(checkout.clone())
        })
        .await?;
    Ok(Json(checkout))
}

async fn submit_shipping(State(s): State<AppState>, Path(session): Path<String>, Json(form): Json<ShippingAddress>) -> Result<Json<Checkout>> {
    with_checkout(&s, &session, |c| c.submit_shipping(form)).await
}

async fn submit_payment(State(s): State<AppState>, Path(session): Path<String>, Json(form): Json<PaymentForm>) -> Result<Json<Checkout>> {
    let today = Utc::now().date_naive();
    with_checkout(&s, &session, |c| c.submit_payment(&form, today)).await
}

async fn checkout_back(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<Checkout>> {
    with_checkout(&s, &session, Checkout::back).await
}

/// Places the order. The checkout is claimed inside the session update so a
/// concurrent submit is refused, and released again if the write fails.
async fn place_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<Order>)> {
    let (cart, shipping, payment) = s
        .sessions
        .update(&session, |data| {
            let cart = data.cart.clone().filter(|c| !c.is_empty()).ok_or(CheckoutError::EmptyCart)?;
            let checkout = data.checkout.as_mut().ok_or(ShopError::NotFound("checkout"))?;
            let (shipping, payment) = checkout.begin_placing()?;
            Ok::<_, ShopError>((cart, shipping, payment))
        })
        .await?;

    match s.orders.place(user.id, &cart, &shipping, &payment).await {
        Ok(order) => {
            s.sessions
                .update(&session, |data| {
                    data.cart = None;
                    if let Some(checkout) = data.checkout.as_mut() {
                        if let Err(e) = checkout.mark_placed() {
                            tracing::warn!(error = %e, "checkout changed while the order was placed");
                        }
                    }
                })
                .await;
            Ok((StatusCode::CREATED, Json(order)))
        }
        Err(e) => {
            s.sessions
                .update(&session, |data| {
                    if let Some(checkout) = data.checkout.as_mut() {
                        checkout.abort_placing();
                    }
                })
                .await;
            Err(e)
        }
    }
}
