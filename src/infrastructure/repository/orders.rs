use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::cart::{Cart, CartItem, Purchasable};
use crate::domain::aggregates::checkout::{PaymentDetails, ShippingAddress};
use crate::domain::aggregates::order::{Order, OrderItem};
use crate::domain::events::log_events;
use crate::domain::value_objects::Sku;
use crate::{Result, ShopError};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    currency: String,
    shipping_address: Json<ShippingAddress>,
    card_last4: String,
    placed_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    name: String,
    sku: String,
    quantity: i32,
    unit_price: Decimal,
    unit_impact: Decimal,
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem> {
        let item = match self.variant_id {
            Some(id) => Purchasable::Variant(id),
            None => Purchasable::Product(self.product_id),
        };
        let quantity = u32::try_from(self.quantity).map_err(|_| ShopError::Database(sqlx::Error::Protocol("negative order quantity".into())))?;
        Ok(OrderItem {
            id: self.id,
            item,
            product_id: self.product_id,
            name: self.name,
            sku: Sku::new(self.sku)?,
            quantity,
            unit_price: self.unit_price,
            unit_impact: self.unit_impact,
        })
    }
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Turns the cart into an order. Each line decrements stock with a
    /// compare-and-set; any shortfall aborts the whole order.
    pub async fn place(&self, user_id: Uuid, cart: &Cart, shipping: &ShippingAddress, payment: &PaymentDetails) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let mut items = Vec::with_capacity(cart.items().len());
        for line in cart.items() {
            let (unit_price, unit_impact) = take_stock(&mut tx, line).await?;
            items.push(OrderItem {
                id: Uuid::now_v7(),
                item: line.item,
                product_id: line.product_id,
                name: line.name.clone(),
                sku: line.sku.clone(),
                quantity: line.quantity.value(),
                unit_price,
                unit_impact,
            });
        }

        let mut order = Order::place(user_id, items, shipping.clone(), payment.card_last4.clone(), cart.currency())?;
        sqlx::query(
            "INSERT INTO orders (id, user_id, currency, total_price, total_impact, shipping_address, card_last4, placed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id())
        .bind(order.user_id())
        .bind(order.total().currency())
        .bind(order.total().amount())
        .bind(order.total_impact().kg())
        .bind(Json(order.shipping()))
        .bind(order.card_last4())
        .bind(order.placed_at())
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items().iter().enumerate() {
            let variant_id = match item.item {
                Purchasable::Variant(id) => Some(id),
                Purchasable::Product(_) => None,
            };
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, variant_id, name, sku, quantity, unit_price, unit_impact, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(item.id)
            .bind(order.id())
            .bind(item.product_id)
            .bind(variant_id)
            .bind(&item.name)
            .bind(item.sku.as_str())
            .bind(to_i32(item.quantity)?)
            .bind(item.unit_price)
            .bind(item.unit_impact)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        log_events(order.take_events());
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, currency, shipping_address, card_last4, placed_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ShopError::NotFound("order"))?;
        let mut orders = self.assemble(vec![row]).await?;
        orders.pop().ok_or(ShopError::NotFound("order"))
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, currency, shipping_address, card_last4, placed_at FROM orders \
             WHERE user_id = $1 ORDER BY placed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.assemble(rows).await
    }

    async fn assemble(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, variant_id, name, sku, quantity, unit_price, unit_impact \
             FROM order_items WHERE order_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            by_order.entry(row.order_id).or_default().push(row.into_item()?);
        }
        Ok(rows
            .into_iter()
            .map(|r| {
                let items = by_order.remove(&r.id).unwrap_or_default();
                Order::restore(r.id, r.user_id, items, r.shipping_address.0, r.card_last4, &r.currency, r.placed_at)
            })
            .collect())
    }
}

fn to_i32(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| ShopError::Validation("quantity is too large".into()))
}

/// The guarded decrement for a cart target, and the stock read used to
/// explain a refusal.
fn stock_statements(item: Purchasable) -> (&'static str, &'static str) {
    match item {
        Purchasable::Variant(_) => (
            "UPDATE product_variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING price, environmental_impact",
            "SELECT stock FROM product_variants WHERE id = $1",
        ),
        Purchasable::Product(_) => (
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND NOT is_variant_parent AND stock >= $2 RETURNING price, environmental_impact",
            "SELECT COALESCE(stock, 0) FROM products WHERE id = $1 AND NOT is_variant_parent",
        ),
    }
}

/// Why a guarded decrement touched no row.
fn shortfall(available: Option<i32>) -> ShopError {
    match available {
        Some(available) => ShopError::InsufficientStock { available: available.max(0) },
        None => ShopError::NotFound("product"),
    }
}

/// Decrements stock for one cart line and returns the current unit price and impact.
async fn take_stock(conn: &mut PgConnection, line: &CartItem) -> Result<(Decimal, Decimal)> {
    let quantity = to_i32(line.quantity.value())?;
    let (update, current) = stock_statements(line.item);
    let id = match line.item {
        Purchasable::Variant(id) | Purchasable::Product(id) => id,
    };

    let taken: Option<(Decimal, Decimal)> = sqlx::query_as(update).bind(id).bind(quantity).fetch_optional(&mut *conn).await?;
    if let Some(prices) = taken {
        return Ok(prices);
    }
    let available: Option<i32> = sqlx::query_scalar(current).bind(id).fetch_optional(&mut *conn).await?;
    if let Some(available) = available {
        tracing::info!(sku = %line.sku, requested = quantity, available, "stock ran out during checkout");
    }
    Err(shortfall(available))
}
