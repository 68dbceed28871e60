//! Product catalog routes
//!
//! Fetch routes are pure queries; admin routes mutate the catalog and
//! record the corresponding PRODUCT_* fact through the event recorder.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use event_bus::EventType;
use event_store::EventRecorder;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ProductsError;
use crate::models::{Product, ProductRequest};
use crate::repo::ProductRepository;

/// Injected dependencies of the products service
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProductRepository>,
    pub recorder: EventRecorder,
    /// Recorded on product events as the acting operator
    pub admin_email: String,
}

/// Handler for GET /products
pub async fn get_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ProductsError> {
    Ok(Json(state.repo.get_all().await?))
}

/// Handler for GET /products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ProductsError> {
    Ok(Json(state.repo.get_by_id(&id).await?))
}

/// Handler for POST /products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), ProductsError> {
    if request.code.is_empty() {
        return Err(ProductsError::Validation("code must be non-empty".to_string()));
    }

    let request_id = Uuid::new_v4().to_string();
    let product = state.repo.create(request).await?;

    crate::events::record_detached(
        state.recorder.clone(),
        EventType::ProductCreated,
        product.clone(),
        state.admin_email.clone(),
        request_id,
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for PUT /products/{id}
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>, ProductsError> {
    let request_id = Uuid::new_v4().to_string();
    let product = state.repo.update(&id, request).await?;

    crate::events::record_detached(
        state.recorder.clone(),
        EventType::ProductUpdated,
        product.clone(),
        state.admin_email.clone(),
        request_id,
    );

    Ok(Json(product))
}

/// Handler for DELETE /products/{id}
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ProductsError> {
    let request_id = Uuid::new_v4().to_string();
    let removed = state.repo.delete(&id).await?;

    crate::events::record_detached(
        state.recorder.clone(),
        EventType::ProductDeleted,
        removed.clone(),
        state.admin_email.clone(),
        request_id,
    );

    Ok(Json(removed))
}

/// Handler for GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "module": "products",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
