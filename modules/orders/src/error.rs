use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::catalog::CatalogError;
use crate::repos::order_repo::OrderRepoError;
use event_store::EventStoreError;

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Errors surfaced on the synchronous request path.
///
/// Asynchronous notification failures never appear here; they are contained
/// in the pipeline (logs and the dead-letter queue).
#[derive(Debug, thiserror::Error)]
pub enum OrdersError {
    #[error("one or more products not found")]
    ProductsNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrdersError {
    fn status(&self) -> StatusCode {
        match self {
            OrdersError::ProductsNotFound | OrdersError::OrderNotFound => StatusCode::NOT_FOUND,
            OrdersError::Validation(_) => StatusCode::BAD_REQUEST,
            OrdersError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OrdersError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrdersError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<OrderRepoError> for OrdersError {
    fn from(err: OrderRepoError) -> Self {
        match err {
            OrderRepoError::NotFound => OrdersError::OrderNotFound,
            OrderRepoError::Unavailable(e) => OrdersError::Unavailable(e),
            OrderRepoError::Serialization(e) => OrdersError::Internal(e),
        }
    }
}

impl From<CatalogError> for OrdersError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(e) => OrdersError::Unavailable(e),
        }
    }
}

impl From<EventStoreError> for OrdersError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::Unavailable(e) => OrdersError::Unavailable(e),
            EventStoreError::Serialization(e) => OrdersError::Internal(e),
        }
    }
}
