//! Product storage: trait plus Postgres and in-memory implementations

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::{Product, ProductRequest};

#[derive(Debug, thiserror::Error)]
pub enum ProductRepoError {
    #[error("product not found")]
    NotFound,

    #[error("product storage unavailable: {0}")]
    Unavailable(String),
}

/// Catalog storage operations
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Product>, ProductRepoError>;

    async fn get_by_id(&self, id: &str) -> Result<Product, ProductRepoError>;

    /// Batch lookup; missing ids are silently dropped from the result
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductRepoError>;

    /// Persist a new product, assigning its id
    async fn create(&self, request: ProductRequest) -> Result<Product, ProductRepoError>;

    /// Update an existing product; `NotFound` when the id is absent
    async fn update(&self, id: &str, request: ProductRequest) -> Result<Product, ProductRepoError>;

    /// Remove a product, returning the removed row
    async fn delete(&self, id: &str) -> Result<Product, ProductRepoError>;
}

// ============================================================================
// POSTGRES
// ============================================================================

#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    product_name: String,
    code: String,
    price: f64,
    model: String,
    product_url: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            product_name: row.product_name,
            code: row.code,
            price: row.price,
            model: row.model,
            product_url: row.product_url,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, product_name, code, price, model, product_url";

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn get_all(&self) -> Result<Vec<Product>, ProductRepoError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Product, ProductRepoError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;
        row.map(Product::from).ok_or(ProductRepoError::NotFound)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductRepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create(&self, request: ProductRequest) -> Result<Product, ProductRepoError> {
        let product = request.into_product(Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO products (id, product_name, code, price, model, product_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.product_name)
        .bind(&product.code)
        .bind(product.price)
        .bind(&product.model)
        .bind(&product.product_url)
        .execute(&self.pool)
        .await
        .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;

        Ok(product)
    }

    async fn update(&self, id: &str, request: ProductRequest) -> Result<Product, ProductRepoError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products
            SET product_name = $2, code = $3, price = $4, model = $5, product_url = $6
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.product_name)
        .bind(&request.code)
        .bind(request.price)
        .bind(&request.model)
        .bind(&request.product_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;

        row.map(Product::from).ok_or(ProductRepoError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<Product, ProductRepoError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ProductRepoError::Unavailable(e.to_string()))?;

        row.map(Product::from).ok_or(ProductRepoError::NotFound)
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<Mutex<BTreeMap<String, Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn get_all(&self) -> Result<Vec<Product>, ProductRepoError> {
        Ok(self
            .products
            .lock()
            .expect("product repo mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Product, ProductRepoError> {
        self.products
            .lock()
            .expect("product repo mutex poisoned")
            .get(id)
            .cloned()
            .ok_or(ProductRepoError::NotFound)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ProductRepoError> {
        let products = self.products.lock().expect("product repo mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }

    async fn create(&self, request: ProductRequest) -> Result<Product, ProductRepoError> {
        let product = request.into_product(Uuid::new_v4().to_string());
        self.products
            .lock()
            .expect("product repo mutex poisoned")
            .insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn update(&self, id: &str, request: ProductRequest) -> Result<Product, ProductRepoError> {
        let mut products = self.products.lock().expect("product repo mutex poisoned");
        if !products.contains_key(id) {
            return Err(ProductRepoError::NotFound);
        }
        let product = request.into_product(id.to_string());
        products.insert(id.to_string(), product.clone());
        Ok(product)
    }

    async fn delete(&self, id: &str) -> Result<Product, ProductRepoError> {
        self.products
            .lock()
            .expect("product repo mutex poisoned")
            .remove(id)
            .ok_or(ProductRepoError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str, price: f64) -> ProductRequest {
        ProductRequest {
            product_name: format!("Product {code}"),
            code: code.to_string(),
            price,
            model: "M-1".to_string(),
            product_url: "https://example.com/p".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id() {
        let repo = InMemoryProductRepository::new();
        let product = repo.create(request("P1", 10.0)).await.unwrap();
        assert!(!product.id.is_empty());
        assert_eq!(repo.get_by_id(&product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn update_missing_product_is_not_found() {
        let repo = InMemoryProductRepository::new();
        let err = repo.update("missing", request("P1", 10.0)).await.unwrap_err();
        assert!(matches!(err, ProductRepoError::NotFound));
    }

    #[tokio::test]
    async fn batch_lookup_drops_missing_ids() {
        let repo = InMemoryProductRepository::new();
        let p1 = repo.create(request("P1", 10.0)).await.unwrap();
        let found = repo
            .get_by_ids(&[p1.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "P1");
    }

    #[tokio::test]
    async fn delete_returns_removed_product() {
        let repo = InMemoryProductRepository::new();
        let product = repo.create(request("P1", 10.0)).await.unwrap();
        let removed = repo.delete(&product.id).await.unwrap();
        assert_eq!(removed.code, "P1");
        assert!(matches!(
            repo.delete(&product.id).await.unwrap_err(),
            ProductRepoError::NotFound
        ));
    }
}
