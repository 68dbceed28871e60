//! Order storage: trait plus Postgres and in-memory implementations
//!
//! Orders are stored as whole documents under a compound key, the way an
//! item store holds them: partition key = customer email, sort key =
//! order id. The repository assigns the id and creation timestamp.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::{NewOrder, Order};

#[derive(Debug, thiserror::Error)]
pub enum OrderRepoError {
    #[error("order not found")]
    NotFound,

    #[error("order storage unavailable: {0}")]
    Unavailable(String),

    #[error("order serialization failed: {0}")]
    Serialization(String),
}

/// Storage operations the orchestrator depends on
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order, assigning its id and creation timestamp
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepoError>;

    /// Point lookup by compound key
    async fn get(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError>;

    /// Remove by compound key, returning the removed order
    async fn delete(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError>;

    /// Every stored order
    async fn scan_all(&self) -> Result<Vec<Order>, OrderRepoError>;

    /// All orders under one customer email
    async fn query_by_email(&self, email: &str) -> Result<Vec<Order>, OrderRepoError>;
}

fn build_order(order: NewOrder) -> Order {
    Order {
        email: order.email,
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now().timestamp_millis(),
        shipping: order.shipping,
        billing: order.billing,
        products: order.products,
    }
}

// ============================================================================
// POSTGRES
// ============================================================================

/// Production order store over sqlx/Postgres
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: serde_json::Value) -> Result<Order, OrderRepoError> {
        serde_json::from_value(doc).map_err(|e| OrderRepoError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepoError> {
        let order = build_order(order);
        let doc = serde_json::to_value(&order)
            .map_err(|e| OrderRepoError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (pk, sk, created_at, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&order.email)
        .bind(&order.id)
        .bind(order.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| OrderRepoError::Unavailable(e.to_string()))?;

        Ok(order)
    }

    async fn get(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT doc FROM orders WHERE pk = $1 AND sk = $2")
                .bind(email)
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| OrderRepoError::Unavailable(e.to_string()))?;

        match row {
            Some((doc,)) => Self::decode(doc),
            None => Err(OrderRepoError::NotFound),
        }
    }

    async fn delete(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("DELETE FROM orders WHERE pk = $1 AND sk = $2 RETURNING doc")
                .bind(email)
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| OrderRepoError::Unavailable(e.to_string()))?;

        match row {
            Some((doc,)) => Self::decode(doc),
            None => Err(OrderRepoError::NotFound),
        }
    }

    async fn scan_all(&self) -> Result<Vec<Order>, OrderRepoError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT doc FROM orders ORDER BY pk, sk")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| OrderRepoError::Unavailable(e.to_string()))?;

        rows.into_iter().map(|(doc,)| Self::decode(doc)).collect()
    }

    async fn query_by_email(&self, email: &str) -> Result<Vec<Order>, OrderRepoError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT doc FROM orders WHERE pk = $1 ORDER BY sk")
                .bind(email)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| OrderRepoError::Unavailable(e.to_string()))?;

        rows.into_iter().map(|(doc,)| Self::decode(doc)).collect()
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Order store over a BTreeMap, for dev and test
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<Mutex<BTreeMap<(String, String), Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders, for tests
    pub fn len(&self) -> usize {
        self.orders.lock().expect("order repo mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepoError> {
        let order = build_order(order);
        self.orders
            .lock()
            .expect("order repo mutex poisoned")
            .insert((order.email.clone(), order.id.clone()), order.clone());
        Ok(order)
    }

    async fn get(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError> {
        self.orders
            .lock()
            .expect("order repo mutex poisoned")
            .get(&(email.to_string(), order_id.to_string()))
            .cloned()
            .ok_or(OrderRepoError::NotFound)
    }

    async fn delete(&self, email: &str, order_id: &str) -> Result<Order, OrderRepoError> {
        self.orders
            .lock()
            .expect("order repo mutex poisoned")
            .remove(&(email.to_string(), order_id.to_string()))
            .ok_or(OrderRepoError::NotFound)
    }

    async fn scan_all(&self) -> Result<Vec<Order>, OrderRepoError> {
        Ok(self
            .orders
            .lock()
            .expect("order repo mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn query_by_email(&self, email: &str) -> Result<Vec<Order>, OrderRepoError> {
        Ok(self
            .orders
            .lock()
            .expect("order repo mutex poisoned")
            .values()
            .filter(|order| order.email == email)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarrierType, OrderBilling, OrderProduct, OrderShipping, PaymentType, ShippingType};

    fn new_order(email: &str) -> NewOrder {
        NewOrder {
            email: email.to_string(),
            shipping: OrderShipping {
                kind: ShippingType::Economic,
                carrier: CarrierType::Correios,
            },
            billing: OrderBilling {
                payment: PaymentType::Cash,
                total_price: 10.0,
            },
            products: vec![OrderProduct {
                code: "P1".to_string(),
                price: 10.0,
            }],
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.create(new_order("a@b.com")).await.unwrap();
        assert!(!order.id.is_empty());
        assert!(order.created_at > 0);

        let fetched = repo.get("a@b.com", &order.id).await.unwrap();
        assert_eq!(fetched, order);
    }

    #[tokio::test]
    async fn get_missing_order_is_not_found() {
        let repo = InMemoryOrderRepository::new();
        let err = repo.get("a@b.com", "missing").await.unwrap_err();
        assert!(matches!(err, OrderRepoError::NotFound));
    }

    #[tokio::test]
    async fn delete_returns_removed_order() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.create(new_order("a@b.com")).await.unwrap();

        let removed = repo.delete("a@b.com", &order.id).await.unwrap();
        assert_eq!(removed.id, order.id);
        assert!(repo.is_empty());

        let err = repo.delete("a@b.com", &order.id).await.unwrap_err();
        assert!(matches!(err, OrderRepoError::NotFound));
    }

    #[tokio::test]
    async fn query_by_email_filters_partition() {
        let repo = InMemoryOrderRepository::new();
        repo.create(new_order("a@b.com")).await.unwrap();
        repo.create(new_order("a@b.com")).await.unwrap();
        repo.create(new_order("other@b.com")).await.unwrap();

        assert_eq!(repo.query_by_email("a@b.com").await.unwrap().len(), 2);
        assert_eq!(repo.scan_all().await.unwrap().len(), 3);
    }
}
