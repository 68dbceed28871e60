//! Order lifecycle orchestration
//!
//! Each operation performs its storage work first and publishes the
//! resulting fact afterwards, detached: the response to the caller depends
//! solely on the storage outcome.

use std::sync::Arc;

use event_bus::retry::{retry_with_backoff, RetryPolicy};
use event_bus::EventType;
use event_store::EventStore;

use crate::catalog::ProductCatalog;
use crate::error::OrdersError;
use crate::events::OrderEventPublisher;
use crate::models::{
    CreateOrderRequest, NewOrder, Order, OrderBilling, OrderEventView, OrderProduct,
};
use crate::repos::order_repo::OrderStore;

/// Injected dependencies of the orders service; no process-wide singletons
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub events: Arc<dyn EventStore>,
    pub publisher: OrderEventPublisher,
}

/// Create an order.
///
/// Every referenced product id must exist — the batch lookup runs before
/// any write, and a missing id fails the request with nothing persisted
/// and nothing published. The total price is the sum of the constituent
/// product prices.
pub async fn create_order(
    state: &AppState,
    request: CreateOrderRequest,
    request_id: &str,
) -> Result<Order, OrdersError> {
    if request.email.is_empty() {
        return Err(OrdersError::Validation("email must be non-empty".to_string()));
    }

    let products = state.catalog.get_by_ids(&request.product_ids).await?;
    if products.len() != request.product_ids.len() {
        tracing::warn!(
            requested = request.product_ids.len(),
            found = products.len(),
            request_id,
            "order references missing products"
        );
        return Err(OrdersError::ProductsNotFound);
    }

    let total_price: f64 = products.iter().map(|p| p.price).sum();
    let order_products: Vec<OrderProduct> = products
        .into_iter()
        .map(|p| OrderProduct {
            code: p.code,
            price: p.price,
        })
        .collect();

    let order = state
        .orders
        .create(NewOrder {
            email: request.email,
            shipping: request.shipping,
            billing: OrderBilling {
                payment: request.payment,
                total_price,
            },
            products: order_products,
        })
        .await?;

    state
        .publisher
        .publish_detached(EventType::OrderCreated, order.clone(), request_id.to_string());

    tracing::info!(order_id = %order.id, request_id, "order created");
    Ok(order)
}

/// Delete an order by its compound key, returning the removed order.
///
/// Publishing the deletion fact is detached the same way as on create; a
/// notification failure does not undo the delete.
pub async fn delete_order(
    state: &AppState,
    email: &str,
    order_id: &str,
    request_id: &str,
) -> Result<Order, OrdersError> {
    let removed = state.orders.delete(email, order_id).await?;

    state
        .publisher
        .publish_detached(EventType::OrderDeleted, removed.clone(), request_id.to_string());

    tracing::info!(order_id = %removed.id, request_id, "order deleted");
    Ok(removed)
}

/// Point lookup; pure query, no events published
pub async fn get_order(
    state: &AppState,
    email: &str,
    order_id: &str,
) -> Result<Order, OrdersError> {
    Ok(state.orders.get(email, order_id).await?)
}

/// All orders for one customer
pub async fn get_orders_by_email(state: &AppState, email: &str) -> Result<Vec<Order>, OrdersError> {
    Ok(state.orders.query_by_email(email).await?)
}

/// Every stored order
pub async fn get_all_orders(state: &AppState) -> Result<Vec<Order>, OrdersError> {
    Ok(state.orders.scan_all().await?)
}

/// Event history for a customer, via the store's secondary index.
///
/// With no explicit event type the ORDER_ family is returned; a full type
/// string narrows to that type. Store unavailability gets one local retry
/// with backoff, then propagates.
pub async fn get_order_events(
    state: &AppState,
    email: &str,
    event_type: Option<&str>,
) -> Result<Vec<OrderEventView>, OrdersError> {
    let prefix = event_type.unwrap_or("ORDER_");

    let records = retry_with_backoff(
        || state.events.query_by_customer(email, Some(prefix)),
        &RetryPolicy::single_retry(),
        "query_order_events",
    )
    .await?;

    Ok(records.into_iter().map(OrderEventView::from).collect())
}
