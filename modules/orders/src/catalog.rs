//! Product catalog access: the orchestrator's read-only view
//!
//! Order creation validates and prices against the catalog owned by the
//! products service; only the batch lookup is needed here.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::models::CatalogProduct;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("product catalog unavailable: {0}")]
    Unavailable(String),
}

/// Batch lookup against the product catalog
///
/// Missing ids are silently dropped from the result; the caller compares
/// lengths to detect them.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<CatalogProduct>, CatalogError>;
}

/// Catalog lookup against the products table
#[derive(Clone)]
pub struct PostgresProductCatalog {
    pool: PgPool,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<CatalogProduct>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, f64)> =
            sqlx::query_as("SELECT id, code, price FROM products WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, code, price)| CatalogProduct { id, code, price })
            .collect())
    }
}

/// In-memory catalog for dev and test
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<Mutex<BTreeMap<String, CatalogProduct>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product, keyed by its id
    pub fn insert(&self, product: CatalogProduct) {
        self.products
            .lock()
            .expect("catalog mutex poisoned")
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<CatalogProduct>, CatalogError> {
        let products = self.products.lock().expect("catalog mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn batch_lookup_drops_missing_ids() {
        let catalog = InMemoryProductCatalog::new();
        catalog.insert(CatalogProduct {
            id: "id-1".to_string(),
            code: "P1".to_string(),
            price: 10.0,
        });

        let found = catalog
            .get_by_ids(&["id-1".to_string(), "id-2".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "P1");
    }
}
