//! Order CRUD routes
//!
//! Thin handlers over the service layer. Each request gets a generated
//! correlation id that rides the published envelope end-to-end.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::OrdersError;
use crate::models::{CreateOrderRequest, OrderResponse};
use crate::service::{self, AppState};

/// Query parameters for GET /orders
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrdersQuery {
    pub email: Option<String>,
    pub order_id: Option<String>,
}

/// Query parameters for DELETE /orders
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderQuery {
    pub email: String,
    pub order_id: String,
}

/// Handler for POST /orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrdersError> {
    let request_id = Uuid::new_v4().to_string();
    let order = service::create_order(&state, request, &request_id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Handler for GET /orders
///
/// - `?email&orderId` — one order (404 when absent)
/// - `?email` — all of a customer's orders
/// - no parameters — every order
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetOrdersQuery>,
) -> Result<Response, OrdersError> {
    match (params.email, params.order_id) {
        (Some(email), Some(order_id)) => {
            let order = service::get_order(&state, &email, &order_id).await?;
            Ok(Json(OrderResponse::from(order)).into_response())
        }
        (Some(email), None) => {
            let orders = service::get_orders_by_email(&state, &email).await?;
            let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
            Ok(Json(body).into_response())
        }
        (None, None) => {
            let orders = service::get_all_orders(&state).await?;
            let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
            Ok(Json(body).into_response())
        }
        (None, Some(_)) => Err(OrdersError::Validation(
            "orderId requires email".to_string(),
        )),
    }
}

/// Handler for DELETE /orders?email&orderId
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteOrderQuery>,
) -> Result<Json<OrderResponse>, OrdersError> {
    let request_id = Uuid::new_v4().to_string();
    let removed =
        service::delete_order(&state, &params.email, &params.order_id, &request_id).await?;
    Ok(Json(OrderResponse::from(removed)))
}

/// Handler for GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "module": "orders",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
