//! Domain events
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug)]
pub enum ProductEvent {
    Created { product_id: Uuid, name: String, variant_parent: bool },
    VariantsReconciled { product_id: Uuid, created: usize, updated: usize, deleted: usize },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug)]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal, items: usize },
}

/// Writes drained events to the log.
pub fn log_events(events: impl IntoIterator<Item = DomainEvent>) {
    for event in events {
        match &event {
            DomainEvent::Product(ProductEvent::Created { product_id, variant_parent, .. }) => {
                tracing::info!(%product_id, variant_parent, "product created");
            }
            DomainEvent::Product(ProductEvent::VariantsReconciled { product_id, created, updated, deleted }) => {
                tracing::info!(%product_id, created, updated, deleted, "variants reconciled");
            }
            DomainEvent::Product(ProductEvent::Deleted { product_id }) => {
                tracing::info!(%product_id, "product deleted");
            }
            DomainEvent::Order(OrderEvent::Placed { order_id, user_id, total, items }) => {
                tracing::info!(%order_id, %user_id, %total, items, "order placed");
            }
        }
    }
}
